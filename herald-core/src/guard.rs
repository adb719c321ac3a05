//! Delivery idempotence.
//!
//! A message may be stored more than once (one copy under each participant's
//! namespace) and every copy fires its own trigger. The guard reads the
//! `notificationSent` flag on each existing copy before dispatch and sets it
//! on all of them afterwards. The flag writes are independent and not
//! transactional with the dispatch: a crash in between can repeat a
//! notification, never lose one.

#![forbid(unsafe_code)]

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

use crate::fields;
use crate::store::{Document, DocumentPath, DocumentStore};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Always send, never touch flags.
    #[default]
    Disabled,
    /// Check and flag only the copy that fired the trigger.
    SingleCopy,
    /// Check and flag the triggering copy and its mirror.
    Mirrored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCopy {
    pub path: DocumentPath,
    pub notification_sent: bool,
}

/// `false` only when there is at least one copy and every copy is flagged.
pub fn should_send(copies: &[MessageCopy]) -> bool {
    copies.is_empty() || copies.iter().any(|c| !c.notification_sent)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReport {
    pub updated: Vec<DocumentPath>,
    pub failed: Vec<DocumentPath>,
}

impl MarkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct DeliveryGuard {
    store: Arc<dyn DocumentStore>,
    policy: GuardPolicy,
}

impl DeliveryGuard {
    pub fn new(store: Arc<dyn DocumentStore>, policy: GuardPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub fn candidate_paths(
        &self,
        primary: &DocumentPath,
        mirror: Option<&DocumentPath>,
    ) -> Vec<DocumentPath> {
        match self.policy {
            GuardPolicy::Disabled => Vec::new(),
            GuardPolicy::SingleCopy => vec![primary.clone()],
            GuardPolicy::Mirrored => {
                let mut paths = vec![primary.clone()];
                if let Some(mirror) = mirror.filter(|m| *m != primary) {
                    paths.push(mirror.clone());
                }
                paths
            }
        }
    }

    /// Reads the flag from each path; copies that do not exist are skipped.
    pub async fn load_copies(&self, paths: &[DocumentPath]) -> Result<Vec<MessageCopy>> {
        let mut copies = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(document) = self.store.get(path).await? {
                copies.push(MessageCopy {
                    path: path.clone(),
                    notification_sent: fields::bool_field(&document, fields::NOTIFICATION_SENT)
                        .unwrap_or(false),
                });
            }
        }
        Ok(copies)
    }

    pub fn should_send(&self, copies: &[MessageCopy]) -> bool {
        match self.policy {
            GuardPolicy::Disabled => true,
            GuardPolicy::SingleCopy | GuardPolicy::Mirrored => should_send(copies),
        }
    }

    /// Flags every copy. Each write is attempted regardless of the others;
    /// failures are logged and reported, never retried here.
    pub async fn mark_sent(&self, copies: &[MessageCopy]) -> MarkReport {
        let writes = copies.iter().map(|copy| async move {
            let mut flag = Document::new();
            flag.insert(fields::NOTIFICATION_SENT.to_string(), Value::Bool(true));
            (&copy.path, self.store.update(&copy.path, flag).await)
        });

        let mut report = MarkReport::default();
        for (path, result) in join_all(writes).await {
            match result {
                Ok(()) => report.updated.push(path.clone()),
                Err(e) => {
                    error!(path = %path, error = %e, "Failed to set notificationSent flag");
                    report.failed.push(path.clone());
                }
            }
        }

        if !report.failed.is_empty() && !report.updated.is_empty() {
            warn!(
                updated = report.updated.len(),
                failed = report.failed.len(),
                "Partial notificationSent flag update"
            );
        }
        report
    }
}
