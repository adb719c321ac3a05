//! HTTP handlers for the herald trigger endpoints.

mod events;
mod health;

pub use events::{direct_message_created, group_message_created, presence_changed};
pub use health::health_check;

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Rejects blank identifiers before they reach the store.
pub fn require_id(field: &str, value: &str) -> Result<(), (StatusCode, Json<ApiError>)> {
    if value.trim().is_empty() || value.contains('/') {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                format!("{} must be a non-empty document id", field),
                "INVALID_EVENT",
            )),
        ));
    }
    Ok(())
}
