//! Structured command replies
//!
//! A `Reply` is what a chat front-end renders as a card: a title, an
//! optional description, a colour, named fields and an optional thumbnail.

use gpdb_common::db::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const DARK_GREY: u32 = 0x607d8b;
pub const DARK_TEAL: u32 = 0x11806a;
pub const DARK_GOLD: u32 = 0xc27c0e;
pub const DARK_BLUE: u32 = 0x206694;

const FOOTER: &str = "Gameplay Database";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<ReplyField>,
    pub thumbnail: Option<String>,
    pub footer: String,
    /// Only the invoker should see this reply
    pub ephemeral: bool,
}

impl Reply {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            color: DARK_GREY,
            fields: Vec::new(),
            thumbnail: None,
            footer: FOOTER.to_string(),
            ephemeral: false,
        }
    }

    /// Title-less reply carrying a single message
    pub fn notice(message: impl Into<String>) -> Self {
        Self::new("").description(message)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail = url;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn field(mut self, name: &str, value: impl Display) -> Self {
        self.fields.push(ReplyField {
            name: name.to_string(),
            value: value.to_string(),
            inline: false,
        });
        self
    }

    /// Field rendering `None` for missing values
    pub fn field_opt<T: Display>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self.field(name, "None"),
        }
    }

    /// Field holding a markdown link, or `None`
    pub fn link(self, name: &str, url: Option<&str>) -> Self {
        match url {
            Some(url) => self.field(name, format!("[Open in browser]({})", url)),
            None => self.field(name, "None"),
        }
    }

    /// Value of the first field called `name`
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Append the submitted fields of any entry
    pub fn submission_fields(self, submission: &Submission) -> Self {
        match submission {
            Submission::Creator(c) => self
                .field("Username", &c.username)
                .field_opt("Nationality", c.nationality.as_deref())
                .field_opt("Discord username", c.discord.as_deref())
                .link("Youtube", c.yt.as_deref())
                .field("Recorder name", &c.recorder_name),
            Submission::Layout(l) => self
                .field("Name", &l.name)
                .field("Creator", &l.creator_name)
                .field_opt("Type", l.layout_type.as_deref())
                .field("Length", &l.length)
                .link("YouTube", l.yt.as_deref())
                .field("Music", format!("{} by {}", l.music_name, l.music_artist))
                .field_opt("NG ID", l.music_ngid)
                .field_opt("In-game ID", l.igid)
                .field_opt("Masterlevel", l.masterlevel.as_deref())
                .field_opt("Recorder notes", l.recorder_notes.as_deref())
                .field("Recorder name", &l.recorder_name),
            Submission::Collab(c) => self
                .field("Name", &c.name)
                .field("Host", &c.host_name)
                .field("Builders", c.builders_number)
                .field("Length", &c.length)
                .link("YouTube", c.yt.as_deref())
                .field("Music", format!("{} by {}", c.music_name, c.music_artist))
                .field_opt("NG ID", c.music_ngid)
                .field_opt("In-game ID", c.igid)
                .field_opt("Recorder notes", c.recorder_notes.as_deref())
                .field("Recorder name", &c.recorder_name),
            Submission::Music(m) => self
                .field("Name", &m.name)
                .field("Artist", &m.artist)
                .field("Length", &m.length)
                .field("Type", m.music_type.as_deref().unwrap_or("Unknown"))
                .link("YouTube", m.yt.as_deref())
                .link("SoundCloud", m.soundcloud.as_deref())
                .field_opt("Newgrounds ID", m.ngid)
                .field_opt("Recorder notes", m.recorder_notes.as_deref())
                .field("Recorder name", &m.recorder_name),
            Submission::Artist(a) => self
                .field("Name", &a.name)
                .link("YouTube", a.yt.as_deref())
                .link("SoundCloud", a.soundcloud.as_deref())
                .field_opt("Recorder notes", a.recorder_notes.as_deref())
                .field("Recorder name", &a.recorder_name),
        }
    }
}

/// Confirmation of a direct (moderator) registration
pub fn registered(submission: &Submission) -> Reply {
    Reply::new("Registration (mod action)")
        .description(format!(
            "{} successfully registered",
            submission.kind().label()
        ))
        .submission_fields(submission)
}

/// Confirmation of a registration request
pub fn requested(submission: &Submission) -> Reply {
    Reply::new("Registration request")
        .description(format!(
            "{} request submitted, a moderator will review it",
            submission.kind().label()
        ))
        .submission_fields(submission)
}

/// Oldest pending request, shown to the reviewing moderator only
pub fn pending_request(request: &PendingRequest) -> Reply {
    Reply::new(format!(
        "Pending {} request registration",
        request.kind().label()
    ))
    .description(format!("Submission date : {}", request.submitted_at))
    .field("Request kind", request.kind())
    .field("Request ID", request.id)
    .submission_fields(&request.submission)
    .ephemeral()
}

pub fn not_found(kind: EntityKind) -> String {
    format!("**{}** not found.", kind.label())
}

pub fn creator_overview(creator: &Creator) -> Reply {
    let c = &creator.entry;
    Reply::new(format!("Creator overview : {}", c.username))
        .description("Infos")
        .field("Username", &c.username)
        .field_opt("Nationality", c.nationality.as_deref())
        .field_opt("Discord", c.discord.as_deref())
        .field_opt("Discord uid", c.discord_uid)
        .link("Youtube", c.yt.as_deref())
        .field("Layouts registered", creator.layouts_registered)
        .field("Collab participations", creator.collab_participations)
        .field("Total time built", &creator.total_time_built)
        .field("Registration date", &creator.registration_date)
        .field("Recorder name", &c.recorder_name)
}

pub fn layout_overview(layout: &Layout) -> Reply {
    let l = &layout.entry;
    Reply::new(format!("Layout overview : {}", l.name))
        .description("Infos")
        .field("Creator", &l.creator_name)
        .field("Name", &l.name)
        .field_opt("Type", l.layout_type.as_deref())
        .field("Length", &l.length)
        .link("Youtube", l.yt.as_deref())
        .field_opt("Music NG ID", l.music_ngid)
        .field("Music name", &l.music_name)
        .field("Music artist", &l.music_artist)
        .field_opt("In-game ID", l.igid)
        .field_opt("Masterlevel", l.masterlevel.as_deref())
        .field("Registration date", &layout.registration_date)
        .field("Recorder name", &l.recorder_name)
        .field_opt("Recorder notes", l.recorder_notes.as_deref())
}

pub fn collab_overview(collab: &Collab) -> Reply {
    let c = &collab.entry;
    Reply::new(format!("Collab overview : {}", c.name))
        .description("Infos")
        .color(DARK_TEAL)
        .field("Host", &c.host_name)
        .field("Name", &c.name)
        .field("Builders number", c.builders_number)
        .field("Length", &c.length)
        .link("Youtube", c.yt.as_deref())
        .field_opt("Music NG ID", c.music_ngid)
        .field("Music name", &c.music_name)
        .field("Music artist", &c.music_artist)
        .field_opt("In-game ID", c.igid)
        .field("Registration date", &collab.registration_date)
        .field("Recorder name", &c.recorder_name)
        .field_opt("Recorder notes", c.recorder_notes.as_deref())
}

pub fn music_overview(music: &Music) -> Reply {
    let m = &music.entry;
    Reply::new(format!("Music overview : {}", m.name))
        .description("Infos")
        .color(DARK_GOLD)
        .field("Name", &m.name)
        .field("Artist", &m.artist)
        .field("Length", &m.length)
        .field_opt("Type", m.music_type.as_deref())
        .link("Youtube", m.yt.as_deref())
        .link("SoundCloud", m.soundcloud.as_deref())
        .field("Uses", music.uses)
        .field_opt("NG ID", m.ngid)
        .field("Registration date", &music.registration_date)
        .field("Recorder name", &m.recorder_name)
        .field_opt("Recorder notes", m.recorder_notes.as_deref())
}

pub fn artist_overview(artist: &Artist) -> Reply {
    let a = &artist.entry;
    Reply::new(format!("Artist overview : {}", a.name))
        .description("Infos")
        .color(DARK_BLUE)
        .field("Name", &a.name)
        .link("Youtube", a.yt.as_deref())
        .link("Soundcloud", a.soundcloud.as_deref())
        .field("Songs registered", artist.songs_registered)
        .field("Total song uses", artist.total_song_uses)
        .field("Registration date", &artist.registration_date)
        .field("Recorder name", &a.recorder_name)
        .field_opt("Recorder notes", a.recorder_notes.as_deref())
}
