use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

const MAX_BODY_SIZE: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_v1() -> Router<AppState> {
    Router::new().nest("/events", event_routes())
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/direct-messages", post(handlers::direct_message_created))
        .route("/group-messages", post(handlers::group_message_created))
        .route("/presence", post(handlers::presence_changed))
}
