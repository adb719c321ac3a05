use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub transport: String,
    pub direct_policy: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        transport: state.engine.transport_name().to_string(),
        direct_policy: state.engine.direct_policy().name().to_string(),
    })
}
