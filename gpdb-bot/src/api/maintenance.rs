//! Backup restore command (moderators only)

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{log_command, require_moderator, CommandRequest};
use crate::backup;
use crate::error::ApiResult;
use crate::reply::{Reply, DARK_TEAL};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBackupArgs {
    pub filename: String,
}

/// POST /commands/load_backup
pub async fn load_backup(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<LoadBackupArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "load_backup");
    require_moderator(&state, &body.invoker, "load_backup").await?;

    let summary = backup::load_backup(
        &state.store,
        &state.queue,
        &state.saves_dir,
        &body.args.filename,
    )
    .await?;

    let file_name = summary
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Json(
        Reply::new("Backup loaded")
            .description(format!("**{}** restored", file_name))
            .color(DARK_TEAL)
            .field("Snapshot taken", &summary.snapshot_taken_at)
            .field("Registry rows", summary.rows)
            .field("Pending requests", summary.pending_requests)
            .ephemeral(),
    ))
}
