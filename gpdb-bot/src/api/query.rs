//! Name lookups (anyone)
//!
//! Reads go straight to the store, so a lookup may not yet see a write
//! that is still waiting in the queue.

use axum::{extract::State, Json};
use gpdb_common::db::EntityKind;
use serde::Deserialize;

use super::{log_command, CommandRequest};
use crate::error::{ApiError, ApiResult};
use crate::metadata;
use crate::reply::{self, Reply};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NameArgs {
    pub name: String,
}

/// First match, or the kind's "not found" reply
fn first_match<T>(kind: EntityKind, found: gpdb_common::Result<Vec<T>>) -> ApiResult<T> {
    match found {
        Ok(rows) => rows
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(reply::not_found(kind))),
        Err(e) if e.is_not_found() => Err(ApiError::NotFound(reply::not_found(kind))),
        Err(e) => Err(e.into()),
    }
}

/// POST /commands/get_creator_by_name
pub async fn get_creator_by_name(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<NameArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "get_creator_by_name");

    let creator = first_match(
        EntityKind::Creator,
        state.store.find_creator_by_name(body.args.name.trim()).await,
    )?;
    let avatar = state.metadata.channel_avatar(creator.entry.yt.as_deref()).await;

    Ok(Json(reply::creator_overview(&creator).thumbnail(avatar)))
}

/// POST /commands/get_layout_by_name
pub async fn get_layout_by_name(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<NameArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "get_layout_by_name");

    let layout = first_match(
        EntityKind::Layout,
        state.store.find_layout_by_name(body.args.name.trim()).await,
    )?;
    let thumbnail = metadata::video_thumbnail(layout.entry.yt.as_deref());

    Ok(Json(reply::layout_overview(&layout).thumbnail(thumbnail)))
}

/// POST /commands/get_collab_by_name
pub async fn get_collab_by_name(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<NameArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "get_collab_by_name");

    let collab = first_match(
        EntityKind::Collab,
        state.store.find_collab_by_name(body.args.name.trim()).await,
    )?;
    let thumbnail = metadata::video_thumbnail(collab.entry.yt.as_deref());

    Ok(Json(reply::collab_overview(&collab).thumbnail(thumbnail)))
}

/// POST /commands/get_music_by_name
pub async fn get_music_by_name(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<NameArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "get_music_by_name");

    let music = first_match(
        EntityKind::Music,
        state.store.find_music_by_name(body.args.name.trim()).await,
    )?;
    let thumbnail = metadata::video_thumbnail(music.entry.yt.as_deref());

    Ok(Json(reply::music_overview(&music).thumbnail(thumbnail)))
}

/// POST /commands/get_artist_by_name
pub async fn get_artist_by_name(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<NameArgs>>,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, "get_artist_by_name");

    let artist = first_match(
        EntityKind::Artist,
        state.store.find_artist_by_name(body.args.name.trim()).await,
    )?;
    let avatar = state.metadata.channel_avatar(artist.entry.yt.as_deref()).await;

    Ok(Json(reply::artist_overview(&artist).thumbnail(avatar)))
}
