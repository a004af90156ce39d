//! Alerts for classified messages

use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt;
use tracing::info;

/// Subject line of every alert email.
pub const ALERT_SUBJECT: &str = "New Email Notification";

/// What an alert says about one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub sender: String,
    pub subject: String,
    pub label: String,
}

impl Alert {
    #[must_use]
    pub fn new(sender: &str, subject: &str, label: &str) -> Self {
        Self {
            sender: sender.to_string(),
            subject: subject.to_string(),
            label: label.to_string(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "New email received.\n\nFrom: {}\nSubject: {}\nClassification: {}",
            self.sender, self.subject, self.label
        )
    }
}

/// Delivers alerts through some external transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Sends alerts by SMTP (STARTTLS) to a fixed recipient.
pub struct SmtpNotifier {
    from: Mailbox,
    to: Mailbox,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    /// Build the transport. Addresses are validated here so a bad
    /// configuration fails at startup rather than on the first alert.
    ///
    /// # Errors
    ///
    /// Returns an error if `NOTIFY_FROM` or `NOTIFY_TO` is not a valid
    /// mailbox, or the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::Config(format!("Invalid NOTIFY_FROM: {e}")))?;
        let to: Mailbox = config
            .to
            .parse()
            .map_err(|e| Error::Config(format!("Invalid NOTIFY_TO: {e}")))?;

        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| Error::Config(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            from,
            to,
            transport,
        })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(ALERT_SUBJECT)
            .body(alert.to_string())
            .map_err(|e| Error::Notify(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        let message = self.build_message(alert)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport blocks; keep it off the runtime thread.
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| Error::Notify(format!("SMTP task failed: {e}")))?
            .map_err(|e| Error::Notify(format!("SMTP send failed: {e}")))?;

        info!("Notification sent to {}", self.to);
        Ok(())
    }
}
