//! Key-pathed document storage.
//!
//! Documents are flat JSON objects addressed by slash-separated paths that
//! alternate collection and document ids (`users/u1`,
//! `users/u1/chats/u2/messages/m1`).

#![forbid(unsafe_code)]

mod memory;
mod redb_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

pub use memory::InMemoryDocumentStore;
pub use redb_store::RedbDocumentStore;

pub type Document = serde_json::Map<String, serde_json::Value>;

pub const USERS: &str = "users";
pub const GROUPS: &str = "groups";
pub const CHATS: &str = "chats";
pub const MESSAGES: &str = "messages";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        Self::from_segments(segments)
    }

    pub fn from_segments(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() || segments.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::InvalidPath(segments.join("/")));
        }
        if segments.iter().any(|s| s.contains('/')) {
            return Err(Error::InvalidPath(segments.join("/")));
        }
        if segments.len() % 2 != 0 {
            return Err(Error::InvalidPath(format!(
                "{} does not name a document",
                segments.join("/")
            )));
        }
        Ok(Self { segments })
    }

    pub fn user(user_id: &str) -> Result<Self> {
        Self::from_segments(vec![USERS.into(), user_id.into()])
    }

    pub fn group(group_id: &str) -> Result<Self> {
        Self::from_segments(vec![GROUPS.into(), group_id.into()])
    }

    pub fn direct_message(owner_id: &str, counterpart_id: &str, message_id: &str) -> Result<Self> {
        Self::from_segments(vec![
            USERS.into(),
            owner_id.into(),
            CHATS.into(),
            counterpart_id.into(),
            MESSAGES.into(),
            message_id.into(),
        ])
    }

    pub fn group_message(group_id: &str, message_id: &str) -> Result<Self> {
        Self::from_segments(vec![
            GROUPS.into(),
            group_id.into(),
            MESSAGES.into(),
            message_id.into(),
        ])
    }

    pub fn document_id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.to_string()
    }
}

/// Gateway to the external document store.
///
/// `update` merges fields into an existing document and fails with
/// [`Error::NotFound`] when the document is absent; it never creates one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;
    async fn set(&self, path: &DocumentPath, document: Document) -> Result<()>;
    async fn update(&self, path: &DocumentPath, fields: Document) -> Result<()>;
}

pub(crate) fn merge_fields(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}
