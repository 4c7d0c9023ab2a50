//! Direct registration (moderators only)
//!
//! The entry is queued for insertion and the reply is sent right away; a
//! failed insert is only visible in the worker's log.

use axum::{extract::State, Json};
use gpdb_common::db::{NewArtist, NewCollab, NewCreator, NewLayout, NewMusic, Submission};
use gpdb_common::WriteOp;
use serde::Deserialize;

use super::{log_command, non_blank, require_moderator, required, submission_thumbnail, CommandRequest};
use crate::error::{ApiError, ApiResult};
use crate::reply::{self, Reply};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatorArgs {
    pub username: String,
    pub nationality: Option<String>,
    pub discord: Option<String>,
    pub discord_uid: Option<i64>,
    pub yt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutArgs {
    pub creator_name: String,
    #[serde(rename = "type")]
    pub layout_type: Option<String>,
    pub name: String,
    pub length: String,
    pub yt: Option<String>,
    pub music_ngid: Option<i64>,
    pub music_name: String,
    pub music_artist: String,
    pub igid: Option<i64>,
    pub masterlevel: Option<String>,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollabArgs {
    pub host_name: String,
    pub name: String,
    pub builders_number: i64,
    pub length: String,
    pub yt: Option<String>,
    pub music_ngid: Option<i64>,
    pub music_name: String,
    pub music_artist: String,
    pub igid: Option<i64>,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicArgs {
    pub name: String,
    pub artist: String,
    pub length: String,
    #[serde(rename = "type")]
    pub music_type: Option<String>,
    pub yt: Option<String>,
    pub soundcloud: Option<String>,
    pub ngid: Option<i64>,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistArgs {
    pub name: String,
    pub yt: Option<String>,
    pub soundcloud: Option<String>,
    pub recorder_notes: Option<String>,
}

/// Command arguments that describe a registry entry
pub trait EntryArgs {
    /// Validated submission recorded under `recorder`
    fn into_submission(self, recorder: &str) -> ApiResult<Submission>;
}

impl EntryArgs for CreatorArgs {
    fn into_submission(self, recorder: &str) -> ApiResult<Submission> {
        Ok(Submission::Creator(NewCreator {
            username: required("username", self.username)?,
            nationality: non_blank(self.nationality),
            discord: non_blank(self.discord),
            discord_uid: self.discord_uid,
            yt: non_blank(self.yt),
            recorder_name: recorder.to_string(),
        }))
    }
}

impl EntryArgs for LayoutArgs {
    fn into_submission(self, recorder: &str) -> ApiResult<Submission> {
        Ok(Submission::Layout(NewLayout {
            creator_name: required("creator_name", self.creator_name)?,
            layout_type: non_blank(self.layout_type),
            name: required("name", self.name)?,
            length: required("length", self.length)?,
            yt: non_blank(self.yt),
            music_ngid: self.music_ngid,
            music_name: required("music_name", self.music_name)?,
            music_artist: required("music_artist", self.music_artist)?,
            igid: self.igid,
            masterlevel: non_blank(self.masterlevel),
            recorder_name: recorder.to_string(),
            recorder_notes: non_blank(self.recorder_notes),
        }))
    }
}

impl EntryArgs for CollabArgs {
    fn into_submission(self, recorder: &str) -> ApiResult<Submission> {
        if self.builders_number < 1 {
            return Err(ApiError::BadRequest(
                "'builders_number' must be at least 1".to_string(),
            ));
        }

        Ok(Submission::Collab(NewCollab {
            host_name: required("host_name", self.host_name)?,
            name: required("name", self.name)?,
            builders_number: self.builders_number,
            length: required("length", self.length)?,
            yt: non_blank(self.yt),
            music_ngid: self.music_ngid,
            music_name: required("music_name", self.music_name)?,
            music_artist: required("music_artist", self.music_artist)?,
            igid: self.igid,
            recorder_name: recorder.to_string(),
            recorder_notes: non_blank(self.recorder_notes),
        }))
    }
}

impl EntryArgs for MusicArgs {
    fn into_submission(self, recorder: &str) -> ApiResult<Submission> {
        Ok(Submission::Music(NewMusic {
            name: required("name", self.name)?,
            artist: required("artist", self.artist)?,
            length: required("length", self.length)?,
            music_type: non_blank(self.music_type),
            yt: non_blank(self.yt),
            soundcloud: non_blank(self.soundcloud),
            ngid: self.ngid,
            recorder_name: recorder.to_string(),
            recorder_notes: non_blank(self.recorder_notes),
        }))
    }
}

impl EntryArgs for ArtistArgs {
    fn into_submission(self, recorder: &str) -> ApiResult<Submission> {
        Ok(Submission::Artist(NewArtist {
            name: required("name", self.name)?,
            yt: non_blank(self.yt),
            soundcloud: non_blank(self.soundcloud),
            recorder_name: recorder.to_string(),
            recorder_notes: non_blank(self.recorder_notes),
        }))
    }
}

async fn register<A: EntryArgs>(
    state: AppState,
    body: CommandRequest<A>,
    command: &str,
) -> ApiResult<Json<Reply>> {
    log_command(&body.invoker, command);
    require_moderator(&state, &body.invoker, command).await?;

    let submission = body.args.into_submission(&body.invoker.name)?;
    let thumbnail = submission_thumbnail(&state, &submission).await;
    let reply = reply::registered(&submission).thumbnail(thumbnail);

    state.queue.submit(WriteOp::Register(submission))?;
    Ok(Json(reply))
}

/// POST /commands/add_creator
pub async fn add_creator(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<CreatorArgs>>,
) -> ApiResult<Json<Reply>> {
    register(state, body, "add_creator").await
}

/// POST /commands/add_layout
pub async fn add_layout(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<LayoutArgs>>,
) -> ApiResult<Json<Reply>> {
    register(state, body, "add_layout").await
}

/// POST /commands/add_collab
pub async fn add_collab(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<CollabArgs>>,
) -> ApiResult<Json<Reply>> {
    register(state, body, "add_collab").await
}

/// POST /commands/add_music
pub async fn add_music(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<MusicArgs>>,
) -> ApiResult<Json<Reply>> {
    register(state, body, "add_music").await
}

/// POST /commands/add_artist
pub async fn add_artist(
    State(state): State<AppState>,
    Json(body): Json<CommandRequest<ArtistArgs>>,
) -> ApiResult<Json<Reply>> {
    register(state, body, "add_artist").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_optionals_are_dropped() {
        let args = CreatorArgs {
            username: " Alice ".to_string(),
            nationality: Some("".to_string()),
            discord: Some("alice#1".to_string()),
            discord_uid: None,
            yt: Some("  ".to_string()),
        };

        let Submission::Creator(creator) = args.into_submission("mod").unwrap() else {
            panic!("expected a creator");
        };
        assert_eq!(creator.username, "Alice");
        assert_eq!(creator.nationality, None);
        assert_eq!(creator.discord.as_deref(), Some("alice#1"));
        assert_eq!(creator.yt, None);
        assert_eq!(creator.recorder_name, "mod");
    }

    #[test]
    fn test_collab_needs_builders() {
        let args = CollabArgs {
            host_name: "Alice".to_string(),
            name: "Mega".to_string(),
            builders_number: 0,
            length: "2min".to_string(),
            yt: None,
            music_ngid: None,
            music_name: "M1".to_string(),
            music_artist: "Bob".to_string(),
            igid: None,
            recorder_notes: None,
        };
        assert!(matches!(
            args.into_submission("mod"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_layout_type_is_renamed() {
        let args: LayoutArgs = serde_json::from_str(
            r#"{"creator_name": "Alice", "type": "Wave", "name": "L1", "length": "1min",
                "music_name": "M1", "music_artist": "Bob"}"#,
        )
        .unwrap();
        assert_eq!(args.layout_type.as_deref(), Some("Wave"));
        assert_eq!(args.yt, None);
    }
}
