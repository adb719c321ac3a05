//! Push transport seam and the dispatcher that drives it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::types::{
    BatchResponse, NotificationPayload, PushMessage, SendResponse, Target, TokenResult,
};
use crate::metrics::FanOutMetrics;

/// Largest token list accepted by one multicast call.
pub const MAX_MULTICAST_TOKENS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    NotConfigured(String),
    InvalidToken(String),
    SendFailed(String),
    Retryable(String),
    Permanent(String),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured(what) => write!(f, "transport not configured: {}", what),
            Self::InvalidToken(msg) => write!(f, "invalid registration token: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
            Self::Retryable(msg) => write!(f, "retryable error: {}", msg),
            Self::Permanent(msg) => write!(f, "permanent error: {}", msg),
        }
    }
}

impl std::error::Error for PushError {}

impl PushError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn into_token_result(self) -> TokenResult {
        match self {
            Self::InvalidToken(reason) => TokenResult::InvalidToken { reason },
            other => TokenResult::Failed {
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
pub trait PushSender: Send + Sync {
    fn transport_name(&self) -> &str;

    /// Sends to a single token and returns the transport's message id.
    async fn send(&self, message: &PushMessage, token: &str) -> Result<String, PushError>;

    /// Sends to every token in `message.target`. Per-token failures are
    /// reported in the batch; `Err` means the call as a whole failed.
    async fn send_multicast(&self, message: &PushMessage) -> Result<BatchResponse, PushError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Unicast,
    Multicast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub mode: DispatchMode,
    pub success_count: usize,
    pub failure_count: usize,
    pub invalid_tokens: Vec<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    sender: Arc<dyn PushSender>,
    metrics: FanOutMetrics,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn PushSender>) -> Self {
        Self {
            sender,
            metrics: FanOutMetrics::new(),
        }
    }

    pub fn transport_name(&self) -> &str {
        self.sender.transport_name()
    }

    /// One address goes out as a unicast, more as multicast batches of at
    /// most [`MAX_MULTICAST_TOKENS`]. A rejected token on a unicast is a
    /// per-address failure, not a transport error.
    pub async fn dispatch(
        &self,
        payload: &NotificationPayload,
        addresses: &[String],
    ) -> Result<DispatchReport, PushError> {
        let started = Instant::now();
        let result = match addresses {
            [] => Ok(DispatchReport {
                mode: DispatchMode::Unicast,
                success_count: 0,
                failure_count: 0,
                invalid_tokens: Vec::new(),
            }),
            [token] => self.unicast(payload, token).await,
            _ => self.multicast(payload, addresses).await,
        };
        self.metrics.record_dispatch_latency(started.elapsed());

        match &result {
            Ok(report) => {
                self.metrics.record_token_results(
                    report.success_count,
                    report.failure_count,
                    report.invalid_tokens.len(),
                );
                if !report.invalid_tokens.is_empty() {
                    warn!(
                        transport = %self.sender.transport_name(),
                        tokens = ?report.invalid_tokens,
                        "Transport rejected registration tokens"
                    );
                }
                info!(
                    transport = %self.sender.transport_name(),
                    mode = ?report.mode,
                    success = report.success_count,
                    failure = report.failure_count,
                    "Push dispatched"
                );
            }
            Err(e) => {
                error!(
                    transport = %self.sender.transport_name(),
                    error = %e,
                    addresses = addresses.len(),
                    "Push dispatch failed"
                );
            }
        }
        result
    }

    async fn unicast(
        &self,
        payload: &NotificationPayload,
        token: &str,
    ) -> Result<DispatchReport, PushError> {
        let message = PushMessage::new(payload, Target::Token(token.to_string()));
        match self.sender.send(&message, token).await {
            Ok(message_id) => {
                debug!(message_id = %message_id, "Unicast accepted");
                Ok(DispatchReport {
                    mode: DispatchMode::Unicast,
                    success_count: 1,
                    failure_count: 0,
                    invalid_tokens: Vec::new(),
                })
            }
            Err(PushError::InvalidToken(_)) => Ok(DispatchReport {
                mode: DispatchMode::Unicast,
                success_count: 0,
                failure_count: 1,
                invalid_tokens: vec![token.to_string()],
            }),
            Err(e) => Err(e),
        }
    }

    async fn multicast(
        &self,
        payload: &NotificationPayload,
        addresses: &[String],
    ) -> Result<DispatchReport, PushError> {
        let mut batch = BatchResponse::default();
        let mut accepted_chunks = 0;
        let mut last_error = None;
        for chunk in addresses.chunks(MAX_MULTICAST_TOKENS) {
            let message = PushMessage::new(payload, Target::Tokens(chunk.to_vec()));
            match self.sender.send_multicast(&message).await {
                Ok(response) => {
                    accepted_chunks += 1;
                    batch.responses.extend(response.responses);
                }
                Err(e) => {
                    warn!(error = %e, tokens = chunk.len(), "Multicast chunk failed");
                    let reason = e.to_string();
                    batch
                        .responses
                        .extend(chunk.iter().map(|token| SendResponse {
                            token: token.clone(),
                            result: TokenResult::Failed {
                                reason: reason.clone(),
                            },
                        }));
                    last_error = Some(e);
                }
            }
        }

        // Once any chunk went out the report stands; a failed chunk only
        // counts against its own tokens.
        if accepted_chunks == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(DispatchReport {
            mode: DispatchMode::Multicast,
            success_count: batch.success_count(),
            failure_count: batch.failure_count(),
            invalid_tokens: batch.invalid_tokens(),
        })
    }
}

/// Fans a multicast message out as individual sends and gathers the results,
/// for transports without a native batch call.
pub async fn send_each(sender: &dyn PushSender, message: &PushMessage) -> BatchResponse {
    let tokens: Vec<String> = match &message.target {
        Target::Token(token) => vec![token.clone()],
        Target::Tokens(tokens) => tokens.clone(),
    };

    let sends = tokens.iter().map(|token| async move {
        let result = match sender.send(message, token).await {
            Ok(message_id) => TokenResult::Sent { message_id },
            Err(e) => e.into_token_result(),
        };
        SendResponse {
            token: token.clone(),
            result,
        }
    });

    BatchResponse {
        responses: futures::future::join_all(sends).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct ScriptedSender {
        calls: Mutex<Vec<Target>>,
        invalid: Vec<String>,
        fail_transport: bool,
        fail_from_multicast: Option<usize>,
    }

    impl ScriptedSender {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                invalid: Vec::new(),
                fail_transport: false,
                fail_from_multicast: None,
            }
        }
    }

    #[async_trait]
    impl PushSender for ScriptedSender {
        fn transport_name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, message: &PushMessage, token: &str) -> Result<String, PushError> {
            if message.target == Target::Token(token.to_string()) {
                self.calls.lock().push(message.target.clone());
            }
            if self.fail_transport {
                return Err(PushError::Retryable("unavailable".into()));
            }
            if self.invalid.iter().any(|t| t == token) {
                return Err(PushError::InvalidToken("UNREGISTERED".into()));
            }
            Ok(format!("msg-{}", token))
        }

        async fn send_multicast(&self, message: &PushMessage) -> Result<BatchResponse, PushError> {
            let call = {
                let mut calls = self.calls.lock();
                calls.push(message.target.clone());
                calls.len() - 1
            };
            if self.fail_transport || self.fail_from_multicast.is_some_and(|n| call >= n) {
                return Err(PushError::Retryable("unavailable".into()));
            }
            Ok(send_each(self, message).await)
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload::new("New message from Alice", "Hi")
    }

    #[tokio::test]
    async fn test_single_address_is_unicast() {
        let sender = Arc::new(ScriptedSender::new());
        let dispatcher = Dispatcher::new(sender.clone());

        let report = dispatcher
            .dispatch(&payload(), &["tok-1".to_string()])
            .await
            .unwrap();
        assert_eq!(report.mode, DispatchMode::Unicast);
        assert_eq!(report.success_count, 1);
        assert_eq!(
            sender.calls.lock().as_slice(),
            &[Target::Token("tok-1".into())]
        );
    }

    #[tokio::test]
    async fn test_many_addresses_is_one_multicast() {
        let mut scripted = ScriptedSender::new();
        scripted.invalid = vec!["tok-2".into()];
        let sender = Arc::new(scripted);
        let dispatcher = Dispatcher::new(sender.clone());

        let addresses = vec!["tok-1".to_string(), "tok-2".to_string(), "tok-3".to_string()];
        let report = dispatcher.dispatch(&payload(), &addresses).await.unwrap();

        assert_eq!(report.mode, DispatchMode::Multicast);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.invalid_tokens, vec!["tok-2"]);
        assert_eq!(
            sender.calls.lock().as_slice(),
            &[Target::Tokens(addresses.clone())]
        );
    }

    #[tokio::test]
    async fn test_large_multicast_is_chunked() {
        let sender = Arc::new(ScriptedSender::new());
        let dispatcher = Dispatcher::new(sender.clone());

        let addresses: Vec<String> = (0..MAX_MULTICAST_TOKENS + 1)
            .map(|i| format!("tok-{}", i))
            .collect();
        let report = dispatcher.dispatch(&payload(), &addresses).await.unwrap();

        assert_eq!(report.success_count, MAX_MULTICAST_TOKENS + 1);
        let calls = sender.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), MAX_MULTICAST_TOKENS);
        assert_eq!(calls[1].len(), 1);
    }

    #[tokio::test]
    async fn test_failed_later_chunk_keeps_delivered_results() {
        let mut scripted = ScriptedSender::new();
        scripted.fail_from_multicast = Some(1);
        let dispatcher = Dispatcher::new(Arc::new(scripted));

        let addresses: Vec<String> = (0..MAX_MULTICAST_TOKENS + 1)
            .map(|i| format!("tok-{}", i))
            .collect();
        let report = dispatcher.dispatch(&payload(), &addresses).await.unwrap();

        assert_eq!(report.mode, DispatchMode::Multicast);
        assert_eq!(report.success_count, MAX_MULTICAST_TOKENS);
        assert_eq!(report.failure_count, 1);
        assert!(report.invalid_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_unicast_token_is_a_failure_count() {
        let mut scripted = ScriptedSender::new();
        scripted.invalid = vec!["stale".into()];
        let dispatcher = Dispatcher::new(Arc::new(scripted));

        let report = dispatcher
            .dispatch(&payload(), &["stale".to_string()])
            .await
            .unwrap();
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.invalid_tokens, vec!["stale"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let mut scripted = ScriptedSender::new();
        scripted.fail_transport = true;
        let dispatcher = Dispatcher::new(Arc::new(scripted));

        let err = dispatcher
            .dispatch(&payload(), &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_addresses_never_calls_transport() {
        let sender = Arc::new(ScriptedSender::new());
        let dispatcher = Dispatcher::new(sender.clone());
        let report = dispatcher.dispatch(&payload(), &[]).await.unwrap();
        assert_eq!(report.success_count, 0);
        assert!(sender.calls.lock().is_empty());
    }
}
