//! Document field names shared with the client applications.
//!
//! Some logical fields were written under more than one name over time. Each
//! such field has one [`FieldAlias`] entry; readers go through [`lookup`] so
//! the rest of the crate only ever sees the canonical name.

#![forbid(unsafe_code)]

use serde_json::Value;

use crate::store::Document;

pub const USERNAME: &str = "username";
pub const ACTIVE: &str = "active";
pub const LAST_SEEN: &str = "lastSeen";

pub const GROUP_NAME: &str = "groupName";
pub const PARTICIPANT_IDS: &str = "participantIds";

pub const MESSAGE_TYPE: &str = "type";
pub const SENDER_ID: &str = "senderId";
pub const RECEIVER_ID: &str = "receiverId";
pub const NOTIFICATION_SENT: &str = "notificationSent";

/// Names one logical field is stored under. The first is the canonical name.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub names: &'static [&'static str],
}

pub const MESSAGE_TEXT: FieldAlias = FieldAlias {
    names: &["message", "textMessage"],
};

pub const DEVICE_TOKENS: FieldAlias = FieldAlias {
    names: &["fcmTokens", "fcmToken"],
};

/// First non-null value stored under any of the alias names, in table order.
pub fn lookup<'a>(document: &'a Document, alias: &FieldAlias) -> Option<&'a Value> {
    alias
        .names
        .iter()
        .filter_map(|name| document.get(*name))
        .find(|value| !value.is_null())
}

pub fn string_field(document: &Document, name: &str) -> Option<String> {
    document
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn bool_field(document: &Document, name: &str) -> Option<bool> {
    document.get(name).and_then(Value::as_bool)
}

/// Collects string entries from every alias name, accepting either a single
/// string or an array of strings under each. Blank entries and duplicates are
/// dropped; first-seen order is kept.
pub fn string_list(document: &Document, alias: &FieldAlias) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in alias.names {
        let values: Vec<&str> = match document.get(*name) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };
        for value in values {
            let value = value.trim();
            if !value.is_empty() && !out.iter().any(|v| v == value) {
                out.push(value.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_prefers_canonical_name() {
        let d = doc(json!({"message": "new", "textMessage": "old"}));
        assert_eq!(lookup(&d, &MESSAGE_TEXT), Some(&json!("new")));

        let d = doc(json!({"textMessage": "legacy"}));
        assert_eq!(lookup(&d, &MESSAGE_TEXT), Some(&json!("legacy")));

        let d = doc(json!({"message": null, "textMessage": "legacy"}));
        assert_eq!(lookup(&d, &MESSAGE_TEXT), Some(&json!("legacy")));
    }

    #[test]
    fn test_token_forms() {
        let single = doc(json!({"fcmToken": "tok-1"}));
        assert_eq!(string_list(&single, &DEVICE_TOKENS), vec!["tok-1"]);

        let many = doc(json!({"fcmTokens": ["tok-1", "", "tok-2", "tok-1"]}));
        assert_eq!(string_list(&many, &DEVICE_TOKENS), vec!["tok-1", "tok-2"]);

        let both = doc(json!({"fcmTokens": ["tok-2"], "fcmToken": "tok-1"}));
        assert_eq!(string_list(&both, &DEVICE_TOKENS), vec!["tok-2", "tok-1"]);

        let wrong = doc(json!({"fcmTokens": 42}));
        assert!(string_list(&wrong, &DEVICE_TOKENS).is_empty());
    }
}
