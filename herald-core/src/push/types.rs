//! Push payload and transport result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATA_MESSAGE_ID: &str = "messageId";
pub const DATA_SENDER_ID: &str = "senderId";
pub const DATA_GROUP_ID: &str = "groupId";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Wire shape handed to the transport:
/// `{notification: {title, body}, data: {...}, token | tokens}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub notification: NotificationContent,
    pub data: BTreeMap<String, String>,
    #[serde(flatten)]
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Token(String),
    Tokens(Vec<String>),
}

impl Target {
    pub fn len(&self) -> usize {
        match self {
            Self::Token(_) => 1,
            Self::Tokens(tokens) => tokens.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PushMessage {
    pub fn new(payload: &NotificationPayload, target: Target) -> Self {
        Self {
            notification: NotificationContent {
                title: payload.title.clone(),
                body: payload.body.clone(),
            },
            data: payload.data.clone(),
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenResult {
    Sent { message_id: String },
    InvalidToken { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub token: String,
    pub result: TokenResult,
}

impl SendResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TokenResult::Sent { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }

    pub fn invalid_tokens(&self) -> Vec<String> {
        self.responses
            .iter()
            .filter(|r| matches!(r.result, TokenResult::InvalidToken { .. }))
            .map(|r| r.token.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_message_wire_shape() {
        let payload = NotificationPayload::new("Alice in Hikers", "See you at 8")
            .with_data(DATA_GROUP_ID, "g1")
            .with_data(DATA_SENDER_ID, "alice")
            .with_data(DATA_MESSAGE_ID, "m1");

        let single = PushMessage::new(&payload, Target::Token("tok-1".into()));
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({
                "notification": {"title": "Alice in Hikers", "body": "See you at 8"},
                "data": {"groupId": "g1", "senderId": "alice", "messageId": "m1"},
                "token": "tok-1"
            })
        );

        let multi = PushMessage::new(&payload, Target::Tokens(vec!["a".into(), "b".into()]));
        let value = serde_json::to_value(&multi).unwrap();
        assert_eq!(value["tokens"], json!(["a", "b"]));
        assert!(value.get("token").is_none());
    }

    #[test]
    fn test_batch_counts() {
        let batch = BatchResponse {
            responses: vec![
                SendResponse {
                    token: "a".into(),
                    result: TokenResult::Sent {
                        message_id: "projects/p/messages/1".into(),
                    },
                },
                SendResponse {
                    token: "b".into(),
                    result: TokenResult::InvalidToken {
                        reason: "UNREGISTERED".into(),
                    },
                },
                SendResponse {
                    token: "c".into(),
                    result: TokenResult::Failed {
                        reason: "timeout".into(),
                    },
                },
            ],
        };
        assert_eq!(batch.success_count(), 1);
        assert_eq!(batch.failure_count(), 2);
        assert_eq!(batch.invalid_tokens(), vec!["b"]);
    }
}
