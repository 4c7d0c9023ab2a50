//! Registry models
//!
//! Every registry row is a submitted entry (`New*`) plus the columns the
//! store owns: the id, the registration timestamp, back-references
//! resolved by reconciliation and derived counters. Request rows hold the
//! submitted entry only.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five registry entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Collab,
    Creator,
    Layout,
    Music,
}

impl EntityKind {
    /// All kinds, in tie-break order for pending requests
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Artist,
        EntityKind::Collab,
        EntityKind::Creator,
        EntityKind::Layout,
        EntityKind::Music,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Collab => "collab",
            EntityKind::Creator => "creator",
            EntityKind::Layout => "layout",
            EntityKind::Music => "music",
        }
    }

    /// Registry table name
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Pending-request shadow table name
    pub fn request_table(&self) -> &'static str {
        match self {
            EntityKind::Artist => "requestartist",
            EntityKind::Collab => "requestcollab",
            EntityKind::Creator => "requestcreator",
            EntityKind::Layout => "requestlayout",
            EntityKind::Music => "requestmusic",
        }
    }

    /// Capitalized label for replies ("Creator", "Music", ...)
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Artist => "Artist",
            EntityKind::Collab => "Collab",
            EntityKind::Creator => "Creator",
            EntityKind::Layout => "Layout",
            EntityKind::Music => "Music",
        }
    }

    /// Submitted columns shared by the registry and request tables, in
    /// bind order
    pub(crate) fn entry_columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Creator => &[
                "username",
                "nationality",
                "discord",
                "discord_uid",
                "yt",
                "recorder_name",
            ],
            EntityKind::Layout => &[
                "creator_name",
                "type",
                "name",
                "length",
                "yt",
                "music_ngid",
                "music_name",
                "music_artist",
                "igid",
                "masterlevel",
                "recorder_name",
                "recorder_notes",
            ],
            EntityKind::Collab => &[
                "host_name",
                "name",
                "builders_number",
                "length",
                "yt",
                "music_ngid",
                "music_name",
                "music_artist",
                "igid",
                "recorder_name",
                "recorder_notes",
            ],
            EntityKind::Music => &[
                "name",
                "artist",
                "length",
                "type",
                "yt",
                "soundcloud",
                "ngid",
                "recorder_name",
                "recorder_notes",
            ],
            EntityKind::Artist => &["name", "yt", "soundcloud", "recorder_name", "recorder_notes"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "artist" => Ok(EntityKind::Artist),
            "collab" => Ok(EntityKind::Collab),
            "creator" => Ok(EntityKind::Creator),
            "layout" => Ok(EntityKind::Layout),
            "music" => Ok(EntityKind::Music),
            other => Err(Error::InvalidInput(format!("Unknown entity kind '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Submitted entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewCreator {
    pub username: String,
    pub nationality: Option<String>,
    /// Discord username
    pub discord: Option<String>,
    /// Discord numeric user id
    pub discord_uid: Option<i64>,
    pub yt: Option<String>,
    pub recorder_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewLayout {
    /// Creator username, resolved to `creator_id` by reconciliation
    pub creator_name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub layout_type: Option<String>,
    pub name: String,
    pub length: String,
    pub yt: Option<String>,
    pub music_ngid: Option<i64>,
    pub music_name: String,
    pub music_artist: String,
    pub igid: Option<i64>,
    /// Collab this layout is a part of, if any
    pub masterlevel: Option<String>,
    pub recorder_name: String,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewCollab {
    /// Host username, resolved to `host_id` by reconciliation
    pub host_name: String,
    pub name: String,
    pub builders_number: i64,
    pub length: String,
    pub yt: Option<String>,
    pub music_ngid: Option<i64>,
    pub music_name: String,
    pub music_artist: String,
    pub igid: Option<i64>,
    pub recorder_name: String,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewMusic {
    pub name: String,
    /// Artist name, resolved to `artist_id` by reconciliation
    pub artist: String,
    pub length: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub music_type: Option<String>,
    pub yt: Option<String>,
    pub soundcloud: Option<String>,
    /// Newgrounds id
    pub ngid: Option<i64>,
    pub recorder_name: String,
    pub recorder_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewArtist {
    pub name: String,
    pub yt: Option<String>,
    pub soundcloud: Option<String>,
    pub recorder_name: String,
    pub recorder_notes: Option<String>,
}

/// A submitted entry of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entry", rename_all = "lowercase")]
pub enum Submission {
    Creator(NewCreator),
    Layout(NewLayout),
    Collab(NewCollab),
    Music(NewMusic),
    Artist(NewArtist),
}

impl Submission {
    pub fn kind(&self) -> EntityKind {
        match self {
            Submission::Creator(_) => EntityKind::Creator,
            Submission::Layout(_) => EntityKind::Layout,
            Submission::Collab(_) => EntityKind::Collab,
            Submission::Music(_) => EntityKind::Music,
            Submission::Artist(_) => EntityKind::Artist,
        }
    }

    /// Display name of the submitted entity
    pub fn name(&self) -> &str {
        match self {
            Submission::Creator(c) => &c.username,
            Submission::Layout(l) => &l.name,
            Submission::Collab(c) => &c.name,
            Submission::Music(m) => &m.name,
            Submission::Artist(a) => &a.name,
        }
    }

    pub fn recorder_name(&self) -> &str {
        match self {
            Submission::Creator(c) => &c.recorder_name,
            Submission::Layout(l) => &l.recorder_name,
            Submission::Collab(c) => &c.recorder_name,
            Submission::Music(m) => &m.recorder_name,
            Submission::Artist(a) => &a.recorder_name,
        }
    }

    /// Replace the recorder, as done when a moderator approves a request
    pub fn with_recorder(mut self, recorder: &str) -> Self {
        let slot = match &mut self {
            Submission::Creator(c) => &mut c.recorder_name,
            Submission::Layout(l) => &mut l.recorder_name,
            Submission::Collab(c) => &mut c.recorder_name,
            Submission::Music(m) => &mut m.recorder_name,
            Submission::Artist(a) => &mut a.recorder_name,
        };
        *slot = recorder.to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Registry rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Creator {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: NewCreator,
    pub registration_date: String,
    pub layouts_registered: i64,
    pub collab_participations: i64,
    pub total_time_built: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Layout {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: NewLayout,
    pub registration_date: String,
    pub creator_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub music_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collab {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: NewCollab,
    pub registration_date: String,
    pub host_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub music_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Music {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: NewMusic,
    pub registration_date: String,
    pub uses: i64,
    pub artist_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Artist {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: NewArtist,
    pub registration_date: String,
    pub songs_registered: i64,
    pub total_song_uses: i64,
}

/// A submission waiting for moderator review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: i64,
    pub submitted_at: String,
    pub submission: Submission,
}

impl PendingRequest {
    pub fn kind(&self) -> EntityKind {
        self.submission.kind()
    }
}

/// Position of the oldest pending request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRef {
    pub kind: EntityKind,
    pub id: i64,
    pub submitted_at: String,
}

/// Full copy of every table, used by backups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub created_at: String,
    pub creators: Vec<Creator>,
    pub layouts: Vec<Layout>,
    pub collabs: Vec<Collab>,
    pub musics: Vec<Music>,
    pub artists: Vec<Artist>,
    pub requests: Vec<PendingRequest>,
}
