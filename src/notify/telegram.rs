//! Telegram Bot API sender (`sendMessage`, HTML parse mode).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Delivery, Notifier, NotifyError, SEND_TIMEOUT};
use crate::config::TelegramSettings;
use crate::event::Notification;

/// Public Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Generic Telegram Bot API response wrapper.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends notifications to one Telegram chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("bot_token", &"__REDACTED__")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier against the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &TelegramSettings) -> Result<Self, NotifyError> {
        Self::with_api_base(settings, TELEGRAM_API_BASE)
    }

    /// Create a notifier against a custom Bot API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_base(settings: &TelegramSettings, api_base: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            bot_token: settings.bot_token.clone(),
            chat_id: settings.chat_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifyError> {
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", notification.html.as_str()),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let resp = self.client.post(self.endpoint()).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // The API reports failures as `ok: false` with a description, usually
        // alongside a 4xx status.
        let parsed: Option<TelegramResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(r) if r.ok && status.is_success() => {
                debug!(chat_id = %self.chat_id, "sent Telegram message");
                Ok(Delivery::Complete)
            }
            Some(r) => Err(NotifyError::Api(
                r.description
                    .unwrap_or_else(|| format!("sendMessage failed with {status}")),
            )),
            None => Err(NotifyError::Api(format!(
                "sendMessage returned {status} with unparseable body"
            ))),
        }
    }
}
