//! Moderator review of pending requests

use axum::{extract::State, Json};
use gpdb_common::db::EntityKind;
use gpdb_common::WriteOp;
use serde::Deserialize;
use tracing::info;

use super::{log_command, require_moderator, submission_thumbnail, BareCommand, CommandRequest};
use crate::error::{ApiError, ApiResult};
use crate::reply::{self, Reply};
use crate::AppState;

pub const NO_PENDING_MESSAGE: &str = "**No** pending requests at the moment.";
pub const FETCH_FAILED_MESSAGE: &str = "**Failed** to fetch request details";
pub const ACCEPTED_MESSAGE: &str = "✅ Request **accepted** and **processed!**";
pub const REJECTED_MESSAGE: &str = "❌ Request **rejected** and **deleted.**";

/// Identifies one pending request
#[derive(Debug, Clone, Deserialize)]
pub struct RequestArgs {
    pub kind: EntityKind,
    pub id: i64,
}

/// POST /commands/review_next_request
///
/// Shows the oldest pending request across all five kinds.
pub async fn review_next_request(
    State(state): State<AppState>,
    Json(body): Json<BareCommand>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "review_next_request");
    require_moderator(&state, &body.invoker, "review_next_request").await?;

    let oldest = match state.store.oldest_pending_request().await {
        Ok(oldest) => oldest,
        Err(e) if e.is_not_found() => {
            return Ok(Json(Reply::notice(NO_PENDING_MESSAGE).ephemeral()));
        }
        Err(e) => return Err(e.into()),
    };

    let request = match state.store.request_details(oldest.kind, oldest.id).await {
        Ok(request) => request,
        // Deleted between the two reads
        Err(e) if e.is_not_found() => return Err(ApiError::NotFound(FETCH_FAILED_MESSAGE.to_string())),
        Err(e) => return Err(e.into()),
    };

    let thumbnail = submission_thumbnail(&state, &request.submission).await;
    Ok(Json(reply::pending_request(&request).thumbnail(thumbnail)))
}

/// POST /commands/accept_request
pub async fn accept_request(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<RequestArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "accept_request");
    require_moderator(&state, &body.invoker, "accept_request").await?;

    let RequestArgs { kind, id } = body.args;
    match state.store.request_details(kind, id).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::NotFound(FETCH_FAILED_MESSAGE.to_string())),
        Err(e) => return Err(e.into()),
    }

    state.queue.submit(WriteOp::ApproveRequest {
        kind,
        id,
        moderator: body.invoker.name.clone(),
    })?;

    info!(kind = %kind, id, moderator = %body.invoker.name, "Request accepted");
    Ok(Json(Reply::notice(ACCEPTED_MESSAGE).ephemeral()))
}

/// POST /commands/reject_request
pub async fn reject_request(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<RequestArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "reject_request");
    require_moderator(&state, &body.invoker, "reject_request").await?;

    let RequestArgs { kind, id } = body.args;
    state.queue.submit(WriteOp::DeleteRequest { kind, id })?;

    info!(kind = %kind, id, moderator = %body.invoker.name, "Request rejected");
    Ok(Json(Reply::notice(REJECTED_MESSAGE).ephemeral()))
}
