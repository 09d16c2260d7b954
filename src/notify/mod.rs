//! Outbound notification channels.
//!
//! Each channel implements [`Notifier`]. The pipeline calls every configured
//! notifier independently; a failure in one never prevents the others.
//!
//! Two channels are implemented:
//! - [`telegram::TelegramNotifier`]: Bot API `sendMessage`
//! - [`email::EmailNotifier`]: one SMTP session per notification

use std::time::Duration;

use async_trait::async_trait;

use crate::event::Notification;

pub mod email;
pub mod telegram;

/// Timeout applied to every outbound network call.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Telegram API rejected the request.
    #[error("Telegram API error: {0}")]
    Api(String),

    /// SMTP transport or protocol failure.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// A configured mailbox could not be parsed.
    #[error("invalid address {address:?}: {reason}")]
    Address {
        /// The offending entry.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The mail message could not be assembled.
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// No configured recipient could be parsed.
    #[error("no usable recipients")]
    NoRecipients,

    /// Every recipient was refused by the server.
    #[error("all recipients refused: {}", .0.join(", "))]
    AllRecipientsRefused(Vec<String>),

    /// The blocking mail task panicked or was cancelled.
    #[error("mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What happened to a delivery that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Every recipient accepted the message.
    Complete,
    /// Some recipients were refused; the rest received the message.
    Partial {
        /// Refused recipients with the server's reason.
        refused: Vec<(String, String)>,
    },
}

/// A notification channel.
///
/// Implementations must be `Send + Sync` so the pipeline can hold them as
/// trait objects.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs (`telegram`, `email`).
    fn channel(&self) -> &'static str;

    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] on transport, protocol, or address failure.
    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifyError>;
}
