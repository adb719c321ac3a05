#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod error;
pub mod event;
pub mod fanout;
pub mod fields;
pub mod guard;
pub mod identity;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod presence;
pub mod push;
pub mod recipients;
pub mod store;

pub use compose::{DirectPhrasing, NotificationComposer};
pub use config::{ApiConfig, Config, FanOutConfig, PushConfig, PushTransport};
pub use error::{Error, Result};
pub use event::{DirectMessageCreated, GroupMessageCreated, Outcome, PresenceChanged};
pub use fanout::FanOutEngine;
pub use guard::{DeliveryGuard, GuardPolicy, MarkReport, MessageCopy};
pub use identity::{IdentityResolver, ResolvedUser};
pub use metrics::{FanOutMetrics, MetricsRecorder};
pub use model::{Group, Message, MessageKind, User};
pub use policy::DirectPolicy;
pub use presence::PresenceSync;
pub use push::{
    build_sender, BatchResponse, DispatchMode, DispatchReport, Dispatcher, FcmConfig, FcmSender,
    LoggingSender, NotificationPayload, PushError, PushMessage, PushSender, Target, TokenResult,
};
pub use recipients::{DeliverySet, DeliveryTarget, RecipientSetBuilder, TokenSelection};
pub use store::{
    Document, DocumentPath, DocumentStore, InMemoryDocumentStore, RedbDocumentStore,
};
