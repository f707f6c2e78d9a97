use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Outbound email handed to the platform's transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Email transport port
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

fn check_recipient(to: &str) -> Result<(), NotificationError> {
    if to.contains('@') && !to.trim().is_empty() {
        Ok(())
    } else {
        Err(NotificationError::InvalidRecipient(to.to_string()))
    }
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        check_recipient(&message.to)?;
        info!(
            to = %message.to,
            subject = %message.subject,
            bytes = message.html_body.len(),
            "email dispatched"
        );
        Ok(())
    }
}

/// Keeps sent emails in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryMailer {
    sent: RwLock<Vec<EmailMessage>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        check_recipient(&message.to)?;
        self.sent.write().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Pending payment reminder".to_string(),
            html_body: "<p>hola</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn in_memory_mailer_records_messages() {
        let mailer = InMemoryMailer::new();
        mailer.send(message("ana@example.com")).await.unwrap();
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
    }

    #[tokio::test]
    async fn recipient_without_at_sign_is_rejected() {
        let mailer = LogMailer;
        assert_matches!(
            mailer.send(message("not-an-address")).await,
            Err(NotificationError::InvalidRecipient(_))
        );
    }
}
