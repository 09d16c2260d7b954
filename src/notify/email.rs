//! SMTP sender.
//!
//! Opens one SMTP session per notification (implicit TLS or STARTTLS), issues
//! one `RCPT TO` per recipient and keeps going when only some recipients are
//! refused. The session is blocking and runs on tokio's blocking pool.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use tracing::{debug, warn};

use super::{Delivery, Notifier, NotifyError, SEND_TIMEOUT};
use crate::config::SmtpSettings;
use crate::event::Notification;

/// Sends notifications by mail.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    settings: SmtpSettings,
}

impl EmailNotifier {
    /// Create a notifier from resolved SMTP settings.
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifyError> {
        debug!(
            to = %self.settings.to.join(", "),
            ssl = self.settings.ssl,
            starttls = self.settings.starttls,
            port = self.settings.port,
            "sending email"
        );
        let settings = self.settings.clone();
        let notification = notification.clone();
        tokio::task::spawn_blocking(move || send_blocking(&settings, &notification)).await?
    }
}

/// Parse recipient entries, skipping the ones that are not valid mailboxes.
///
/// # Errors
///
/// Returns [`NotifyError::NoRecipients`] when nothing usable remains.
pub fn parse_recipients(entries: &[String]) -> Result<Vec<Mailbox>, NotifyError> {
    let mut mailboxes = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.parse::<Mailbox>() {
            Ok(mb) => mailboxes.push(mb),
            Err(e) => warn!(recipient = %entry, error = %e, "skipping invalid recipient"),
        }
    }
    if mailboxes.is_empty() {
        return Err(NotifyError::NoRecipients);
    }
    Ok(mailboxes)
}

/// Assemble the RFC 5322 message.
///
/// # Errors
///
/// Returns an error if the sender is invalid or the message cannot be built.
pub fn build_message(
    from: &str,
    to: &[Mailbox],
    notification: &Notification,
) -> Result<Message, NotifyError> {
    let from: Mailbox = from.parse().map_err(|e: lettre::address::AddressError| {
        NotifyError::Address {
            address: from.to_owned(),
            reason: e.to_string(),
        }
    })?;

    let builder = to.iter().cloned().fold(
        Message::builder()
            .from(from)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN),
        |b, mb| b.to(mb),
    );
    Ok(builder.body(notification.plain.clone())?)
}

fn send_blocking(
    settings: &SmtpSettings,
    notification: &Notification,
) -> Result<Delivery, NotifyError> {
    let recipients = parse_recipients(&settings.to)?;
    let message = build_message(&settings.from, &recipients, notification)?;
    let sender = message.envelope().from().cloned();

    let hello = ClientId::default();
    let server = (settings.host.as_str(), settings.port);

    let mut conn = if settings.ssl {
        let tls = TlsParameters::new(settings.host.clone())?;
        SmtpConnection::connect(server, Some(SEND_TIMEOUT), &hello, Some(&tls), None)?
    } else {
        let mut conn = SmtpConnection::connect(server, Some(SEND_TIMEOUT), &hello, None, None)?;
        if settings.starttls {
            if conn.can_starttls() {
                let tls = TlsParameters::new(settings.host.clone())?;
                conn.starttls(&tls, &hello)?;
            } else {
                warn!(host = %settings.host, "server does not offer STARTTLS, continuing without TLS");
            }
        }
        conn
    };

    if let Some((user, password)) = settings.credentials() {
        let creds = Credentials::new(user.to_owned(), password.to_owned());
        conn.auth(&[Mechanism::Plain, Mechanism::Login], &creds)?;
    }

    conn.command(Mail::new(sender, vec![]))?;

    let mut refused = Vec::new();
    let mut accepted = 0usize;
    for mb in &recipients {
        match conn.command(Rcpt::new(mb.email.clone(), vec![])) {
            Ok(_) => accepted = accepted.saturating_add(1),
            Err(e) => refused.push((mb.email.to_string(), e.to_string())),
        }
    }

    if accepted == 0 {
        conn.abort();
        return Err(NotifyError::AllRecipientsRefused(
            refused.into_iter().map(|(addr, _)| addr).collect(),
        ));
    }

    conn.command(Data)?;
    conn.message(&message.formatted())?;
    if let Err(e) = conn.quit() {
        debug!(error = %e, "SMTP QUIT failed after successful delivery");
    }

    if refused.is_empty() {
        Ok(Delivery::Complete)
    } else {
        Ok(Delivery::Partial { refused })
    }
}
