//! HTTP command surface for gpdb-bot
//!
//! Every command is `POST /commands/<name>` with a body of the form
//!
//! ```json
//! { "invoker": { "id": 42, "name": "alice" }, "args": { ... } }
//! ```
//!
//! and answers with a [`Reply`](crate::reply::Reply).

pub mod health;
pub mod maintenance;
pub mod query;
pub mod registration;
pub mod registry;
pub mod requests;
pub mod review;

pub use health::health_routes;

use axum::routing::{get, post};
use axum::Router;
use gpdb_common::db::Submission;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Authorization;
use crate::error::{ApiError, ApiResult};
use crate::metadata;
use crate::AppState;

pub const UNAUTHORIZED_MESSAGE: &str = "**You** are not authorized !";

/// User who ran a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoker {
    pub id: i64,
    pub name: String,
}

/// Body of every command
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest<A> {
    pub invoker: Invoker,
    pub args: A,
}

/// Body of commands without arguments
#[derive(Debug, Clone, Deserialize)]
pub struct BareCommand {
    pub invoker: Invoker,
}

pub(crate) fn log_command(invoker: &Invoker, command: &str) {
    debug!(
        user = %invoker.name,
        user_id = invoker.id,
        command,
        "Command invoked"
    );
}

/// Fail with the "not authorized" reply unless `invoker` is a moderator
pub(crate) async fn require_moderator(
    state: &AppState,
    invoker: &Invoker,
    command: &str,
) -> ApiResult<()> {
    match state.whitelist.check(invoker, command).await {
        Authorization::Authorized => Ok(()),
        Authorization::Denied { .. } => Err(ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())),
    }
}

/// Image shown next to a submission: video thumbnail, or channel avatar
/// for creators and artists
pub(crate) async fn submission_thumbnail(state: &AppState, submission: &Submission) -> Option<String> {
    match submission {
        Submission::Creator(c) => state.metadata.channel_avatar(c.yt.as_deref()).await,
        Submission::Artist(a) => state.metadata.channel_avatar(a.yt.as_deref()).await,
        Submission::Layout(l) => metadata::video_thumbnail(l.yt.as_deref()),
        Submission::Collab(c) => metadata::video_thumbnail(c.yt.as_deref()),
        Submission::Music(m) => metadata::video_thumbnail(m.yt.as_deref()),
    }
}

/// Trimmed value, `None` when blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed value of a mandatory argument
pub(crate) fn required(field: &str, value: String) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("'{}' must not be empty", field)));
    }
    Ok(value.to_string())
}

/// Routes for every command
pub fn command_routes() -> Router<AppState> {
    Router::new()
        .route("/commands/add_creator", post(registration::add_creator))
        .route("/commands/add_layout", post(registration::add_layout))
        .route("/commands/add_collab", post(registration::add_collab))
        .route("/commands/add_music", post(registration::add_music))
        .route("/commands/add_artist", post(registration::add_artist))
        .route("/commands/request_creator", post(requests::request_creator))
        .route("/commands/request_layout", post(requests::request_layout))
        .route("/commands/request_collab", post(requests::request_collab))
        .route("/commands/request_music", post(requests::request_music))
        .route("/commands/request_artist", post(requests::request_artist))
        .route("/commands/get_creator_by_name", post(query::get_creator_by_name))
        .route("/commands/get_layout_by_name", post(query::get_layout_by_name))
        .route("/commands/get_collab_by_name", post(query::get_collab_by_name))
        .route("/commands/get_music_by_name", post(query::get_music_by_name))
        .route("/commands/get_artist_by_name", post(query::get_artist_by_name))
        .route("/commands/review_next_request", post(review::review_next_request))
        .route("/commands/accept_request", post(review::accept_request))
        .route("/commands/reject_request", post(review::reject_request))
        .route("/commands/load_backup", post(maintenance::load_backup))
}

/// Read-only listing routes
pub fn registry_routes() -> Router<AppState> {
    Router::new()
        .route("/registry/requests", get(registry::list_requests))
        .route("/registry/:entity", get(registry::list_entity))
}
