//! Registration requests (anyone)

use axum::{extract::State, Json};
use gpdb_common::WriteOp;

use super::registration::{ArtistArgs, CollabArgs, CreatorArgs, EntryArgs, LayoutArgs, MusicArgs};
use super::{log_command, submission_thumbnail, CommandRequest};
use crate::error::ApiResult;
use crate::reply::{self, Reply};
use crate::AppState;

async fn submit_request<A: EntryArgs>(
    state: AppState,
    body: CommandRequest<A>,
    command: &str,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, command);

    let submission = body.args.into_submission(&body.invoker.name)?;
    let thumbnail = submission_thumbnail(&state, &submission).await;
    let reply = reply::requested(&submission).thumbnail(thumbnail);

    state.queue.submit(WriteOp::SubmitRequest(submission))?;
    Ok(Json(reply))
}

/// POST /commands/request_creator
pub async fn request_creator(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<CreatorArgs>>,
) -> ApiResult<Json<Reply>> {
    submit_request(state, body, "request_creator").await
}

/// POST /commands/request_layout
pub async fn request_layout(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<LayoutArgs>>,
) -> ApiResult<Json<Reply>> {
    submit_request(state, body, "request_layout").await
}

/// POST /commands/request_collab
pub async fn request_collab(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<CollabArgs>>,
) -> ApiResult<Json<Reply>> {
    submit_request(state, body, "request_collab").await
}

/// POST /commands/request_music
pub async fn request_music(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<MusicArgs>>,
) -> ApiResult<Json<Reply>> {
    submit_request(state, body, "request_music").await
}

/// POST /commands/request_artist
pub async fn request_artist(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<ArtistArgs>>,
) -> ApiResult<Json<Reply>> {
    submit_request(state, body, "request_artist").await
}
