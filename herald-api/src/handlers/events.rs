use axum::{extract::State, Json};
use herald_core::{DirectMessageCreated, GroupMessageCreated, Outcome, PresenceChanged};

use super::{require_id, ApiResult};
use crate::state::AppState;

/// Answers 200 for every well-formed event. Delivery results are in the body.
pub async fn direct_message_created(
    State(state): State<AppState>,
    Json(event): Json<DirectMessageCreated>,
) -> ApiResult<Outcome> {
    require_id("ownerId", &event.owner_id)?;
    require_id("counterpartId", &event.counterpart_id)?;
    require_id("messageId", &event.message_id)?;

    Ok(Json(state.engine.handle_direct_message(&event).await))
}

pub async fn group_message_created(
    State(state): State<AppState>,
    Json(event): Json<GroupMessageCreated>,
) -> ApiResult<Outcome> {
    require_id("groupId", &event.group_id)?;
    require_id("messageId", &event.message_id)?;

    Ok(Json(state.engine.handle_group_message(&event).await))
}

pub async fn presence_changed(
    State(state): State<AppState>,
    Json(event): Json<PresenceChanged>,
) -> ApiResult<Outcome> {
    require_id("userId", &event.user_id)?;

    Ok(Json(state.presence.apply(&event).await))
}
