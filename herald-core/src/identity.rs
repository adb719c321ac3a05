#![forbid(unsafe_code)]

use std::sync::Arc;

use crate::model::User;
use crate::store::{DocumentPath, DocumentStore};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    pub user_id: String,
    pub display_name: String,
    pub addresses: Vec<String>,
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn DocumentStore>,
    fallback_name: String,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            fallback_name: "Unknown".to_string(),
        }
    }

    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    pub fn fallback_name(&self) -> &str {
        &self.fallback_name
    }

    /// `Ok(None)` when the user document does not exist.
    pub async fn resolve_user(&self, user_id: &str) -> Result<Option<ResolvedUser>> {
        let path = DocumentPath::user(user_id)?;
        let Some(document) = self.store.get(&path).await? else {
            return Ok(None);
        };

        let user = User::from_document(user_id, &document);
        Ok(Some(ResolvedUser {
            user_id: user.id,
            display_name: user
                .display_name
                .unwrap_or_else(|| self.fallback_name.clone()),
            addresses: user.tokens,
        }))
    }

    /// Like [`resolve_user`](Self::resolve_user) but substitutes the fallback
    /// name and an empty address list for missing users.
    pub async fn resolve_or_fallback(&self, user_id: &str) -> Result<ResolvedUser> {
        match self.resolve_user(user_id).await? {
            Some(user) => Ok(user),
            None => {
                tracing::info!(user_id = %user_id, "User document not found, using fallback identity");
                Ok(ResolvedUser {
                    user_id: user_id.to_string(),
                    display_name: self.fallback_name.clone(),
                    addresses: Vec::new(),
                })
            }
        }
    }
}
