#![forbid(unsafe_code)]

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::identity::IdentityResolver;
use crate::model::Group;
use crate::store::{DocumentPath, DocumentStore};
use crate::Result;

/// Which of a recipient's registered tokens receive the push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSelection {
    #[default]
    All,
    Primary,
}

impl TokenSelection {
    pub fn apply(self, mut tokens: Vec<String>) -> Vec<String> {
        match self {
            Self::All => tokens,
            Self::Primary => {
                tokens.truncate(1);
                tokens
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub user_id: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySet {
    pub targets: Vec<DeliveryTarget>,
    /// Recipients that resolved but have no registered address.
    pub without_address: Vec<String>,
    /// Recipients whose user document is missing or could not be read.
    pub unresolved: Vec<String>,
}

impl DeliverySet {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All target tokens, deduplicated across recipients.
    pub fn tokens(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut tokens = Vec::new();
        for token in self.targets.iter().flat_map(|t| t.tokens.iter()) {
            if seen.insert(token.as_str()) {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

#[derive(Debug, Clone)]
pub struct GroupRecipients {
    pub group: Group,
    pub recipients: BTreeSet<String>,
}

#[derive(Clone)]
pub struct RecipientSetBuilder {
    store: Arc<dyn DocumentStore>,
    resolver: IdentityResolver,
    token_selection: TokenSelection,
}

impl RecipientSetBuilder {
    pub fn new(store: Arc<dyn DocumentStore>, resolver: IdentityResolver) -> Self {
        Self {
            store,
            resolver,
            token_selection: TokenSelection::All,
        }
    }

    pub fn with_token_selection(mut self, selection: TokenSelection) -> Self {
        self.token_selection = selection;
        self
    }

    pub fn direct(receiver_id: &str) -> BTreeSet<String> {
        BTreeSet::from([receiver_id.to_string()])
    }

    /// Participants of the group minus the sender. `Ok(None)` when the group
    /// document does not exist.
    pub async fn group(&self, group_id: &str, sender_id: &str) -> Result<Option<GroupRecipients>> {
        let path = DocumentPath::group(group_id)?;
        let Some(document) = self.store.get(&path).await? else {
            info!(group_id = %group_id, "Group document not found");
            return Ok(None);
        };

        let group = Group::from_document(group_id, &document);
        let recipients = group
            .participant_ids
            .iter()
            .filter(|id| id.as_str() != sender_id)
            .cloned()
            .collect();

        Ok(Some(GroupRecipients { group, recipients }))
    }

    /// Looks up every recipient concurrently and keeps those with at least
    /// one address.
    pub async fn resolve_addresses(&self, recipients: &BTreeSet<String>) -> DeliverySet {
        let lookups = recipients.iter().map(|user_id| async move {
            (user_id, self.resolver.resolve_user(user_id).await)
        });

        let mut set = DeliverySet::default();
        for (user_id, result) in join_all(lookups).await {
            match result {
                Ok(Some(user)) => {
                    let tokens = self.token_selection.apply(user.addresses);
                    if tokens.is_empty() {
                        debug!(user_id = %user_id, "Recipient has no registered device token");
                        set.without_address.push(user_id.clone());
                    } else {
                        debug!(user_id = %user_id, tokens = tokens.len(), "Found tokens for recipient");
                        set.targets.push(DeliveryTarget {
                            user_id: user_id.clone(),
                            tokens,
                        });
                    }
                }
                Ok(None) => {
                    info!(user_id = %user_id, "Recipient user document not found");
                    set.unresolved.push(user_id.clone());
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Failed to resolve recipient");
                    set.unresolved.push(user_id.clone());
                }
            }
        }
        set
    }
}
