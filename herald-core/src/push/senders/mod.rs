//! Push transport implementations.

mod fcm;
mod logging;

use std::sync::Arc;

pub use fcm::{FcmConfig, FcmSender};
pub use logging::LoggingSender;

use crate::config::{PushConfig, PushTransport};
use crate::push::service::{PushError, PushSender};

/// Builds the transport named by the configuration.
pub fn build_sender(config: &PushConfig) -> Result<Arc<dyn PushSender>, PushError> {
    match config.transport {
        PushTransport::Logging => Ok(Arc::new(LoggingSender::default())),
        PushTransport::Fcm => {
            let fcm = FcmConfig::from_push_config(config)?;
            if fcm.access_token.is_none() {
                tracing::warn!(
                    env = %config.access_token_env,
                    "FCM access token not set; sends will fail until it is provided"
                );
            }
            Ok(Arc::new(FcmSender::new(fcm)))
        }
    }
}
