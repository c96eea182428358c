//! Alert delivery.

use crate::config::EmailConfig;
use crate::error::AlertError;
use crate::models::alert::AlertEvent;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{info, warn};

const STARTTLS_PORT: u16 = 587;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

impl From<&AlertEvent> for Email {
    fn from(event: &AlertEvent) -> Self {
        Self {
            subject: event.subject(),
            body: event.body(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), AlertError>;
}

/// Authenticated SMTP submission. Port 587 uses STARTTLS, anything else
/// implicit TLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, AlertError> {
        let from: Mailbox = config.from.parse().map_err(|e| {
            AlertError::NotificationFailure(format!("invalid sender '{}': {}", config.from, e))
        })?;
        let to: Mailbox = config.to.parse().map_err(|e| {
            AlertError::NotificationFailure(format!("invalid recipient '{}': {}", config.to, e))
        })?;

        let builder = if config.smtp_port == STARTTLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| AlertError::NotificationFailure(format!("smtp setup failed: {}", e)))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.from.clone(), config.password.clone()))
            .build();

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: &Email) -> Result<(), AlertError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| AlertError::NotificationFailure(format!("failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AlertError::NotificationFailure(e.to_string()))?;

        info!(subject = %email.subject, to = %self.to, "alert email sent");
        Ok(())
    }
}

/// Emails a [`LogNotifier`] remembers by default.
pub const LOG_HISTORY_LIMIT: usize = 100;

/// Logs alerts instead of mailing them. Used when no email is configured.
///
/// Only the most recent `limit` emails are kept.
#[derive(Debug)]
pub struct LogNotifier {
    sent: Mutex<VecDeque<Email>>,
    limit: usize,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::with_limit(LOG_HISTORY_LIMIT)
    }
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            sent: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    /// Recently "sent" emails, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &Email) -> Result<(), AlertError> {
        warn!(subject = %email.subject, body = %email.body, "ALERT (email not configured)");
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AlertError::NotificationFailure("notifier lock poisoned".to_string()))?;
        if self.limit == 0 {
            return Ok(());
        }
        if sent.len() == self.limit {
            sent.pop_front();
        }
        sent.push_back(email.clone());
        Ok(())
    }
}
