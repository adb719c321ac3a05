use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::PushConfig;
use crate::push::service::{send_each, PushError, PushSender};
use crate::push::types::{BatchResponse, PushMessage};

#[derive(Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for FcmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmConfig")
            .field("project_id", &self.project_id)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FcmConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: "https://fcm.googleapis.com".to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_push_config(config: &PushConfig) -> Result<Self, PushError> {
        let project_id = config
            .project_id
            .clone()
            .ok_or_else(|| PushError::NotConfigured("push.project_id".into()))?;
        Ok(Self {
            project_id,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        )
    }
}

/// Firebase Cloud Messaging HTTP v1 transport. The v1 API has no batch call,
/// so multicast is a concurrent send per token.
pub struct FcmSender {
    client: reqwest::Client,
    config: FcmConfig,
}

#[derive(Deserialize)]
struct SendResult {
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

impl FcmSender {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request_body(message: &PushMessage, token: &str) -> Value {
        json!({
            "message": {
                "token": token,
                "notification": {
                    "title": message.notification.title,
                    "body": message.notification.body,
                },
                "data": message.data,
            }
        })
    }

    fn classify(status: reqwest::StatusCode, body: &str) -> PushError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let error_code = parsed
            .as_ref()
            .and_then(|e| e.error.details.iter().find_map(|d| d.error_code.clone()))
            .or_else(|| parsed.as_ref().map(|e| e.error.status.clone()))
            .unwrap_or_default();
        let message = parsed
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());

        match (status.as_u16(), error_code.as_str()) {
            (_, "UNREGISTERED") | (404, _) => PushError::InvalidToken(message),
            (400, "INVALID_ARGUMENT") => PushError::InvalidToken(message),
            (401 | 403, _) => PushError::Permanent(format!("authentication rejected: {}", message)),
            (429, _) => PushError::Retryable(format!("quota exceeded: {}", message)),
            (s, _) if s >= 500 => PushError::Retryable(format!("server error: {}", message)),
            _ => PushError::SendFailed(message),
        }
    }
}

#[async_trait]
impl PushSender for FcmSender {
    fn transport_name(&self) -> &str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage, token: &str) -> Result<String, PushError> {
        let access_token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| PushError::NotConfigured("fcm access token".into()))?;

        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(access_token)
            .json(&Self::request_body(message, token))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    PushError::Retryable(e.to_string())
                } else {
                    PushError::SendFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let result: SendResult = response
                .json()
                .await
                .map_err(|e| PushError::SendFailed(e.to_string()))?;
            Ok(result.name)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify(status, &body))
        }
    }

    async fn send_multicast(&self, message: &PushMessage) -> Result<BatchResponse, PushError> {
        if self.config.access_token.is_none() {
            return Err(PushError::NotConfigured("fcm access token".into()));
        }
        Ok(send_each(self, message).await)
    }
}
