//! Trigger events delivered by the document store, and the terminal state each
//! handler reports back.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::guard::MarkReport;
use crate::push::DispatchReport;

/// A message document was created under `users/{owner}/chats/{counterpart}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessageCreated {
    pub owner_id: String,
    pub counterpart_id: String,
    pub message_id: String,
}

/// A message document was created under `groups/{group}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageCreated {
    pub group_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChanged {
    pub user_id: String,
    pub active: bool,
}

/// How an invocation ended. Every variant is a successful completion from the
/// trigger source's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// A document the handler depends on does not exist.
    NotFound { path: String },
    NoRecipients,
    AlreadySent,
    Delivered {
        report: DispatchReport,
        flags: MarkReport,
    },
    /// The transport failed as a whole; nothing is retried.
    DispatchFailed { error: String },
    /// A store read failed before anything was sent.
    Aborted { error: String },
    Updated { path: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NoRecipients => "no_recipients",
            Self::AlreadySent => "already_sent",
            Self::Delivered { .. } => "delivered",
            Self::DispatchFailed { .. } => "dispatch_failed",
            Self::Aborted { .. } => "aborted",
            Self::Updated { .. } => "updated",
        }
    }

    pub fn not_found(path: impl ToString) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }
}
