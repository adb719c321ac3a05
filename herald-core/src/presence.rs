#![forbid(unsafe_code)]

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::event::{Outcome, PresenceChanged};
use crate::fields;
use crate::metrics::FanOutMetrics;
use crate::store::{Document, DocumentPath, DocumentStore};
use crate::Error;

const SOURCE_PRESENCE: &str = "presence";

/// Mirrors a client's online state onto its user document.
#[derive(Clone)]
pub struct PresenceSync {
    store: Arc<dyn DocumentStore>,
    metrics: FanOutMetrics,
}

impl PresenceSync {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            metrics: FanOutMetrics::new(),
        }
    }

    /// Sets `active` and `lastSeen` (epoch millis). The user document must
    /// already exist; it is never created here.
    pub async fn apply(&self, event: &PresenceChanged) -> Outcome {
        let span = info_span!(
            "presence",
            invocation_id = %Uuid::new_v4(),
            user_id = %event.user_id,
            active = event.active,
        );

        async {
            let outcome = self.update(event).await;
            self.metrics.record_outcome(SOURCE_PRESENCE, outcome.label());
            outcome
        }
        .instrument(span)
        .await
    }

    async fn update(&self, event: &PresenceChanged) -> Outcome {
        let path = match DocumentPath::user(&event.user_id) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "Invalid user id");
                return Outcome::Aborted {
                    error: e.to_string(),
                };
            }
        };

        let mut presence = Document::new();
        presence.insert(fields::ACTIVE.to_string(), Value::Bool(event.active));
        presence.insert(
            fields::LAST_SEEN.to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );

        match self.store.update(&path, presence).await {
            Ok(()) => {
                info!(path = %path, "Presence updated");
                Outcome::Updated {
                    path: path.to_string(),
                }
            }
            Err(Error::NotFound(_)) => {
                info!(path = %path, "User document not found, presence not recorded");
                Outcome::not_found(path)
            }
            Err(e) => {
                error!(path = %path, error = %e, "Failed to update presence");
                Outcome::Aborted {
                    error: e.to_string(),
                }
            }
        }
    }
}
