//! Per-event notification fan-out.
//!
//! Each trigger runs to exactly one terminal [`Outcome`]:
//! `Received -> RecipientsResolved -> {NoRecipients | PayloadComposed ->
//! {AlreadySent | Dispatched -> FlagsUpdated}}`. Nothing is retried inside an
//! invocation and no failure is surfaced to the trigger source.

#![forbid(unsafe_code)]

use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::compose::NotificationComposer;
use crate::config::FanOutConfig;
use crate::event::{DirectMessageCreated, GroupMessageCreated, Outcome};
use crate::fields;
use crate::guard::{DeliveryGuard, GuardPolicy, MessageCopy};
use crate::identity::IdentityResolver;
use crate::metrics::FanOutMetrics;
use crate::model::Message;
use crate::policy::DirectPolicy;
use crate::push::{
    Dispatcher, NotificationPayload, PushSender, DATA_GROUP_ID, DATA_MESSAGE_ID, DATA_SENDER_ID,
};
use crate::recipients::RecipientSetBuilder;
use crate::store::{DocumentPath, DocumentStore};
use crate::Result;

const SOURCE_DIRECT: &str = "direct";
const SOURCE_GROUP: &str = "group";

#[derive(Clone)]
pub struct FanOutEngine {
    store: Arc<dyn DocumentStore>,
    resolver: IdentityResolver,
    recipients: RecipientSetBuilder,
    composer: NotificationComposer,
    direct_policy: DirectPolicy,
    direct_guard: DeliveryGuard,
    group_guard: DeliveryGuard,
    dispatcher: Dispatcher,
    default_group_name: String,
    metrics: FanOutMetrics,
}

impl FanOutEngine {
    pub fn new(
        config: &FanOutConfig,
        store: Arc<dyn DocumentStore>,
        sender: Arc<dyn PushSender>,
    ) -> Self {
        let resolver = IdentityResolver::new(Arc::clone(&store))
            .with_fallback_name(config.unknown_sender_name.clone());
        let recipients = RecipientSetBuilder::new(Arc::clone(&store), resolver.clone())
            .with_token_selection(config.token_selection);
        let composer = NotificationComposer::new()
            .with_preview_limit(config.preview_limit)
            .with_direct_phrasing(config.direct_policy.phrasing());

        Self {
            direct_guard: DeliveryGuard::new(Arc::clone(&store), config.direct_policy.guard()),
            group_guard: DeliveryGuard::new(Arc::clone(&store), config.group_guard),
            store,
            resolver,
            recipients,
            composer,
            direct_policy: config.direct_policy,
            dispatcher: Dispatcher::new(sender),
            default_group_name: config.default_group_name.clone(),
            metrics: FanOutMetrics::new(),
        }
    }

    pub fn direct_policy(&self) -> DirectPolicy {
        self.direct_policy
    }

    pub fn transport_name(&self) -> &str {
        self.dispatcher.transport_name()
    }

    pub async fn handle_direct_message(&self, event: &DirectMessageCreated) -> Outcome {
        let span = info_span!(
            "direct_message",
            invocation_id = %Uuid::new_v4(),
            owner_id = %event.owner_id,
            counterpart_id = %event.counterpart_id,
            message_id = %event.message_id,
            policy = self.direct_policy.name(),
        );

        async {
            let outcome = self.direct_flow(event).await.unwrap_or_else(aborted);
            self.finish(SOURCE_DIRECT, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    pub async fn handle_group_message(&self, event: &GroupMessageCreated) -> Outcome {
        let span = info_span!(
            "group_message",
            invocation_id = %Uuid::new_v4(),
            group_id = %event.group_id,
            message_id = %event.message_id,
        );

        async {
            let outcome = self.group_flow(event).await.unwrap_or_else(aborted);
            self.finish(SOURCE_GROUP, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn direct_flow(&self, event: &DirectMessageCreated) -> Result<Outcome> {
        let path = DocumentPath::direct_message(
            &event.owner_id,
            &event.counterpart_id,
            &event.message_id,
        )?;
        let Some(document) = self.store.get(&path).await? else {
            info!(path = %path, "Message document not found");
            return Ok(Outcome::not_found(path));
        };
        let message = Message::from_document(path.clone(), &document);
        debug!(kind = message.kind.as_str(), "Message loaded");

        let Some((sender_id, receiver_id)) = self.direct_participants(event, &message) else {
            warn!(path = %path, "Mirrored direct message has no senderId or receiverId");
            return Ok(Outcome::not_found(format!("{}.{}", path, fields::SENDER_ID)));
        };
        if sender_id == receiver_id {
            info!(user_id = %sender_id, "Sender and receiver are the same user");
            return Ok(Outcome::NoRecipients);
        }

        let delivery = self
            .recipients
            .resolve_addresses(&RecipientSetBuilder::direct(&receiver_id))
            .await;
        if delivery.is_empty() {
            info!(receiver_id = %receiver_id, "Receiver has no delivery address");
            return Ok(Outcome::NoRecipients);
        }

        let sender_name = self.sender_name(&sender_id).await;
        let payload = self
            .composer
            .compose(&sender_name, None, &message.kind, message.text.as_deref())
            .with_data(DATA_MESSAGE_ID, &message.id)
            .with_data(DATA_SENDER_ID, &sender_id);

        let mirror = DocumentPath::direct_message(
            &event.counterpart_id,
            &event.owner_id,
            &event.message_id,
        )?;
        let paths = self.direct_guard.candidate_paths(&path, Some(&mirror));
        let copies = self.direct_guard.load_copies(&paths).await?;

        Ok(self
            .deliver(&self.direct_guard, &payload, &delivery.tokens(), &copies)
            .await)
    }

    async fn group_flow(&self, event: &GroupMessageCreated) -> Result<Outcome> {
        let path = DocumentPath::group_message(&event.group_id, &event.message_id)?;
        let Some(document) = self.store.get(&path).await? else {
            info!(path = %path, "Message document not found");
            return Ok(Outcome::not_found(path));
        };
        let message = Message::from_document(path.clone(), &document);
        debug!(kind = message.kind.as_str(), "Message loaded");

        let Some(sender_id) = message.sender_id.clone() else {
            warn!(path = %path, "Group message has no senderId");
            return Ok(Outcome::not_found(format!("{}.{}", path, fields::SENDER_ID)));
        };

        let Some(group) = self.recipients.group(&event.group_id, &sender_id).await? else {
            return Ok(Outcome::not_found(DocumentPath::group(&event.group_id)?));
        };
        if group.recipients.is_empty() {
            info!("Group has no participants besides the sender");
            return Ok(Outcome::NoRecipients);
        }

        let delivery = self.recipients.resolve_addresses(&group.recipients).await;
        if delivery.is_empty() {
            info!(
                without_address = delivery.without_address.len(),
                unresolved = delivery.unresolved.len(),
                "No group recipient has a delivery address"
            );
            return Ok(Outcome::NoRecipients);
        }

        let sender_name = self.sender_name(&sender_id).await;
        let group_name = group
            .group
            .name
            .clone()
            .unwrap_or_else(|| self.default_group_name.clone());
        let payload = self
            .composer
            .compose(
                &sender_name,
                Some(&group_name),
                &message.kind,
                message.text.as_deref(),
            )
            .with_data(DATA_GROUP_ID, &event.group_id)
            .with_data(DATA_MESSAGE_ID, &message.id)
            .with_data(DATA_SENDER_ID, &sender_id);

        let paths = self.group_guard.candidate_paths(&path, None);
        let copies = self.group_guard.load_copies(&paths).await?;

        Ok(self
            .deliver(&self.group_guard, &payload, &delivery.tokens(), &copies)
            .await)
    }

    /// Ids stored on the message take precedence over the path; one stored id
    /// fixes the other as the opposite end of the chat. With none stored the
    /// owner is the receiver, unless mirrored copies fire from both sides, in
    /// which case the direction is unknown.
    fn direct_participants(
        &self,
        event: &DirectMessageCreated,
        message: &Message,
    ) -> Option<(String, String)> {
        let other = |id: &str| {
            if id == event.owner_id {
                event.counterpart_id.clone()
            } else {
                event.owner_id.clone()
            }
        };

        match (message.sender_id.clone(), message.receiver_id.clone()) {
            (Some(sender), Some(receiver)) => Some((sender, receiver)),
            (Some(sender), None) => {
                let receiver = other(&sender);
                Some((sender, receiver))
            }
            (None, Some(receiver)) => Some((other(&receiver), receiver)),
            (None, None) if self.direct_guard.policy() == GuardPolicy::Mirrored => None,
            (None, None) => Some((event.counterpart_id.clone(), event.owner_id.clone())),
        }
    }

    async fn deliver(
        &self,
        guard: &DeliveryGuard,
        payload: &NotificationPayload,
        tokens: &[String],
        copies: &[MessageCopy],
    ) -> Outcome {
        if !guard.should_send(copies) {
            info!(copies = copies.len(), "Notification already sent");
            return Outcome::AlreadySent;
        }

        let report = match self.dispatcher.dispatch(payload, tokens).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Dispatch failed, completing without delivery"
                );
                return Outcome::DispatchFailed {
                    error: e.to_string(),
                };
            }
        };

        let flags = guard.mark_sent(copies).await;
        self.metrics.record_flag_failures(flags.failed.len());
        Outcome::Delivered { report, flags }
    }

    async fn sender_name(&self, sender_id: &str) -> String {
        match self.resolver.resolve_or_fallback(sender_id).await {
            Ok(user) => user.display_name,
            Err(e) => {
                warn!(sender_id = %sender_id, error = %e, "Sender lookup failed");
                self.resolver.fallback_name().to_string()
            }
        }
    }

    fn finish(&self, source: &'static str, outcome: &Outcome) {
        self.metrics.record_outcome(source, outcome.label());
        match outcome {
            Outcome::Delivered { report, flags } => info!(
                success = report.success_count,
                failure = report.failure_count,
                flags_updated = flags.updated.len(),
                flags_failed = flags.failed.len(),
                "Notification delivered"
            ),
            other => info!(outcome = other.label(), "Event handled without delivery"),
        }
    }
}

fn aborted(e: crate::Error) -> Outcome {
    error!(error = %e, "Event handling aborted");
    Outcome::Aborted {
        error: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{send_each, BatchResponse, PushError, PushMessage};
    use crate::store::{Document, InMemoryDocumentStore};
    use crate::Error;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<PushMessage>>,
        unavailable: bool,
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        fn transport_name(&self) -> &str {
            "recording"
        }

        async fn send(
            &self,
            message: &PushMessage,
            _token: &str,
        ) -> std::result::Result<String, PushError> {
            if self.unavailable {
                return Err(PushError::Retryable("503".into()));
            }
            self.sent.lock().push(message.clone());
            Ok("ok".into())
        }

        async fn send_multicast(
            &self,
            message: &PushMessage,
        ) -> std::result::Result<BatchResponse, PushError> {
            Ok(send_each(self, message).await)
        }
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn put(store: &InMemoryDocumentStore, path: &str, value: serde_json::Value) {
        store
            .set(&DocumentPath::parse(path).unwrap(), doc(value))
            .await
            .unwrap();
    }

    async fn seeded_store() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        put(&store, "users/alice", json!({"username": "Alice", "fcmToken": "tok-a"})).await;
        put(&store, "users/bob", json!({"username": "Bob", "fcmTokens": ["tok-b"]})).await;
        store
    }

    fn event(owner: &str, counterpart: &str) -> DirectMessageCreated {
        DirectMessageCreated {
            owner_id: owner.into(),
            counterpart_id: counterpart.into(),
            message_id: "m1".into(),
        }
    }

    fn no_guard() -> FanOutConfig {
        FanOutConfig {
            direct_policy: DirectPolicy::DirectNoGuard,
            ..FanOutConfig::default()
        }
    }

    #[tokio::test]
    async fn test_receiver_defaults_to_owner() {
        let store = seeded_store().await;
        put(&store, "users/bob/chats/alice/messages/m1", json!({"type": "text", "message": "Hi"})).await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&no_guard(), store, sender.clone());

        let outcome = engine.handle_direct_message(&event("bob", "alice")).await;
        assert_eq!(outcome.label(), "delivered");

        let sent = sender.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, crate::push::Target::Token("tok-b".into()));
        assert_eq!(
            sent[0].notification.body,
            "You received a new message from Alice!"
        );
        assert_eq!(sent[0].data.get(DATA_SENDER_ID).map(String::as_str), Some("alice"));
    }

    #[tokio::test]
    async fn test_mirrored_message_without_ids_is_not_guessed() {
        let store = seeded_store().await;
        put(&store, "users/alice/chats/bob/messages/m1", json!({"type": "text", "message": "Hi"})).await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        let outcome = engine.handle_direct_message(&event("alice", "bob")).await;
        assert_eq!(
            outcome,
            Outcome::not_found("users/alice/chats/bob/messages/m1.senderId")
        );
        assert!(sender.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_single_stored_id_fixes_direction() {
        let store = seeded_store().await;
        put(
            &store,
            "users/alice/chats/bob/messages/m1",
            json!({"type": "text", "message": "Hi", "senderId": "alice"}),
        )
        .await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        engine.handle_direct_message(&event("alice", "bob")).await;

        let sent = sender.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, crate::push::Target::Token("tok-b".into()));
        assert_eq!(sent[0].notification.title, "New message from Alice");
    }

    #[tokio::test]
    async fn test_message_ids_override_path() {
        let store = seeded_store().await;
        put(
            &store,
            "users/alice/chats/bob/messages/m1",
            json!({"type": "image", "senderId": "alice", "receiverId": "bob"}),
        )
        .await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        engine.handle_direct_message(&event("alice", "bob")).await;

        let sent = sender.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, crate::push::Target::Token("tok-b".into()));
        assert_eq!(sent[0].notification.body, "sent an image");
    }

    #[tokio::test]
    async fn test_self_message_has_no_recipients() {
        let store = seeded_store().await;
        put(
            &store,
            "users/bob/chats/alice/messages/m1",
            json!({"type": "text", "message": "note", "senderId": "bob", "receiverId": "bob"}),
        )
        .await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        let outcome = engine.handle_direct_message(&event("bob", "alice")).await;
        assert_eq!(outcome, Outcome::NoRecipients);
        assert!(sender.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_leaves_flags_untouched() {
        let store = seeded_store().await;
        put(
            &store,
            "users/bob/chats/alice/messages/m1",
            json!({"type": "text", "message": "Hi", "senderId": "alice"}),
        )
        .await;
        let sender = Arc::new(RecordingSender {
            unavailable: true,
            ..RecordingSender::default()
        });
        let engine = FanOutEngine::new(&FanOutConfig::default(), store.clone(), sender);

        let outcome = engine.handle_direct_message(&event("bob", "alice")).await;
        assert!(matches!(outcome, Outcome::DispatchFailed { .. }));

        let stored = store
            .get(&DocumentPath::parse("users/bob/chats/alice/messages/m1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.get("notificationSent").is_none());
    }

    #[tokio::test]
    async fn test_unknown_sender_uses_fallback_name() {
        let store = Arc::new(InMemoryDocumentStore::new());
        put(&store, "users/bob", json!({"fcmToken": "tok-b"})).await;
        put(&store, "users/bob/chats/ghost/messages/m1", json!({"type": "text", "message": "boo", "senderId": "ghost"})).await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        engine.handle_direct_message(&event("bob", "ghost")).await;
        assert_eq!(
            sender.sent.lock()[0].notification.title,
            "New message from Unknown"
        );
    }

    #[tokio::test]
    async fn test_group_message_without_sender() {
        let store = seeded_store().await;
        put(&store, "groups/g1", json!({"groupName": "Hikers", "participantIds": ["alice", "bob"]})).await;
        put(&store, "groups/g1/messages/m1", json!({"type": "text", "message": "hey"})).await;
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), store, sender.clone());

        let outcome = engine
            .handle_group_message(&GroupMessageCreated {
                group_id: "g1".into(),
                message_id: "m1".into(),
            })
            .await;
        assert_eq!(outcome, Outcome::not_found("groups/g1/messages/m1.senderId"));
        assert!(sender.sent.lock().is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn get(&self, _path: &DocumentPath) -> crate::Result<Option<Document>> {
            Err(Error::Storage("connection reset".into()))
        }

        async fn set(&self, _path: &DocumentPath, _document: Document) -> crate::Result<()> {
            Err(Error::Storage("connection reset".into()))
        }

        async fn update(&self, _path: &DocumentPath, _fields: Document) -> crate::Result<()> {
            Err(Error::Storage("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_quietly() {
        let sender = Arc::new(RecordingSender::default());
        let engine = FanOutEngine::new(&FanOutConfig::default(), Arc::new(BrokenStore), sender.clone());

        let outcome = engine.handle_direct_message(&event("bob", "alice")).await;
        assert!(matches!(outcome, Outcome::Aborted { .. }));
        assert!(sender.sent.lock().is_empty());
    }
}
