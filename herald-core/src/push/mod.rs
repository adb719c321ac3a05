//! Push delivery: payload types, the transport seam, and the dispatcher.

#![forbid(unsafe_code)]

pub mod senders;
mod service;
mod types;

pub use senders::{build_sender, FcmConfig, FcmSender, LoggingSender};
pub use service::{
    send_each, DispatchMode, DispatchReport, Dispatcher, PushError, PushSender,
    MAX_MULTICAST_TOKENS,
};
pub use types::{
    BatchResponse, NotificationContent, NotificationPayload, PushMessage, SendResponse, Target,
    TokenResult, DATA_GROUP_ID, DATA_MESSAGE_ID, DATA_SENDER_ID,
};
