use async_trait::async_trait;
use uuid::Uuid;

use crate::push::service::{send_each, PushError, PushSender};
use crate::push::types::{BatchResponse, PushMessage};

/// Accepts every send and logs it. Used for dry runs and local development.
pub struct LoggingSender {
    name: String,
}

impl LoggingSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LoggingSender {
    fn default() -> Self {
        Self::new("logging")
    }
}

#[async_trait]
impl PushSender for LoggingSender {
    fn transport_name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &PushMessage, token: &str) -> Result<String, PushError> {
        let message_id = format!("{}/{}", self.name, Uuid::new_v4());
        tracing::info!(
            transport = %self.name,
            token = %token,
            title = %message.notification.title,
            body = %message.notification.body,
            message_id = %message_id,
            "push sent"
        );
        Ok(message_id)
    }

    async fn send_multicast(&self, message: &PushMessage) -> Result<BatchResponse, PushError> {
        Ok(send_each(self, message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::types::{NotificationPayload, Target};

    #[tokio::test]
    async fn test_logging_sender_accepts_everything() {
        let sender = LoggingSender::default();
        let payload = NotificationPayload::new("t", "b");

        let id = sender
            .send(&PushMessage::new(&payload, Target::Token("a".into())), "a")
            .await
            .unwrap();
        assert!(id.starts_with("logging/"));

        let batch = sender
            .send_multicast(&PushMessage::new(
                &payload,
                Target::Tokens(vec!["a".into(), "b".into()]),
            ))
            .await
            .unwrap();
        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.failure_count(), 0);
    }
}
