#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{self, FieldAlias};
use crate::store::{Document, DocumentPath};

const PARTICIPANTS: FieldAlias = FieldAlias {
    names: &[fields::PARTICIPANT_IDS],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub tokens: Vec<String>,
    pub active: Option<bool>,
    pub last_seen: Option<i64>,
}

impl User {
    pub fn from_document(id: impl Into<String>, document: &Document) -> Self {
        Self {
            id: id.into(),
            display_name: fields::string_field(document, fields::USERNAME)
                .filter(|name| !name.trim().is_empty()),
            tokens: fields::string_list(document, &fields::DEVICE_TOKENS),
            active: fields::bool_field(document, fields::ACTIVE),
            last_seen: document.get(fields::LAST_SEEN).and_then(Value::as_i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: Option<String>,
    pub participant_ids: Vec<String>,
}

impl Group {
    pub fn from_document(id: impl Into<String>, document: &Document) -> Self {
        Self {
            id: id.into(),
            name: fields::string_field(document, fields::GROUP_NAME)
                .filter(|name| !name.trim().is_empty()),
            participant_ids: fields::string_list(document, &PARTICIPANTS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Gif,
    Other(Option<String>),
}

impl MessageKind {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("text") => Self::Text,
            Some("image") => Self::Image,
            Some("video") => Self::Video,
            Some("audio") => Self::Audio,
            Some("gif") => Self::Gif,
            other => Self::Other(other.map(str::to_string)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Gif => "gif",
            Self::Other(Some(tag)) => tag,
            Self::Other(None) => "unknown",
        }
    }
}

/// One stored copy of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub path: DocumentPath,
    pub kind: MessageKind,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub text: Option<String>,
    pub notification_sent: bool,
}

impl Message {
    pub fn from_document(path: DocumentPath, document: &Document) -> Self {
        Self {
            id: path.document_id().to_string(),
            kind: MessageKind::from_tag(
                document.get(fields::MESSAGE_TYPE).and_then(Value::as_str),
            ),
            sender_id: fields::string_field(document, fields::SENDER_ID)
                .filter(|id| !id.is_empty()),
            receiver_id: fields::string_field(document, fields::RECEIVER_ID)
                .filter(|id| !id.is_empty()),
            text: fields::lookup(document, &fields::MESSAGE_TEXT)
                .and_then(Value::as_str)
                .map(str::to_string),
            notification_sent: fields::bool_field(document, fields::NOTIFICATION_SENT)
                .unwrap_or(false),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_user_from_document() {
        let user = User::from_document(
            "alice",
            &doc(json!({
                "username": "Alice",
                "fcmToken": "tok-a",
                "active": true,
                "lastSeen": 1_700_000_000_000_i64
            })),
        );
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.tokens, vec!["tok-a"]);
        assert_eq!(user.active, Some(true));
        assert_eq!(user.last_seen, Some(1_700_000_000_000));

        let bare = User::from_document("bob", &doc(json!({"username": "  "})));
        assert!(bare.display_name.is_none());
        assert!(bare.tokens.is_empty());
    }

    #[test]
    fn test_group_from_document() {
        let group = Group::from_document(
            "g1",
            &doc(json!({"groupName": "Hikers", "participantIds": ["a", "b", "a"]})),
        );
        assert_eq!(group.name.as_deref(), Some("Hikers"));
        assert_eq!(group.participant_ids, vec!["a", "b"]);

        let unnamed = Group::from_document("g2", &doc(json!({})));
        assert!(unnamed.name.is_none());
        assert!(unnamed.participant_ids.is_empty());
    }

    #[test]
    fn test_message_kind_tags() {
        assert_eq!(MessageKind::from_tag(Some("text")), MessageKind::Text);
        assert_eq!(MessageKind::from_tag(Some("gif")), MessageKind::Gif);
        assert_eq!(
            MessageKind::from_tag(Some("sticker")),
            MessageKind::Other(Some("sticker".into()))
        );
        assert_eq!(MessageKind::from_tag(None), MessageKind::Other(None));
        assert_eq!(MessageKind::from_tag(None).as_str(), "unknown");
    }

    #[test]
    fn test_message_from_document() {
        let path = DocumentPath::direct_message("bob", "alice", "m1").unwrap();
        let message = Message::from_document(
            path.clone(),
            &doc(json!({
                "type": "text",
                "senderId": "alice",
                "receiverId": "bob",
                "textMessage": "Hi"
            })),
        );
        assert_eq!(message.id, "m1");
        assert_eq!(message.path, path);
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.sender_id.as_deref(), Some("alice"));
        assert_eq!(message.text.as_deref(), Some("Hi"));
        assert!(!message.notification_sent);
    }
}
