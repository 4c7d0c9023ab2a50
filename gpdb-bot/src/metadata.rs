//! YouTube metadata lookup
//!
//! Video thumbnails are derived from the video id alone. Channel avatars
//! need the YouTube Data API, and therefore an API key. Every failure
//! (no key, network error, unexpected payload) yields no image rather
//! than an error: replies are always sent, with or without a thumbnail.

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const USER_AGENT: &str = concat!("GPDB/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Metadata lookup errors (logged, never surfaced to replies)
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}")]
    Api(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No matching channel")]
    NoMatch,
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ChannelIdItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippetItem {
    snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Thumbnail,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// How a channel URL names its channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/channel/<id>`
    Id(String),
    /// `/user/<legacy username>`
    User(String),
    /// `/c/<custom name>`
    Custom(String),
}

/// Extract the video id from a `youtu.be/<id>` or `youtube.com/watch?v=<id>` link
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;

    let id = if host == "youtu.be" {
        parsed.path_segments()?.last()?.to_string()
    } else if matches!(host, "youtube.com" | "www.youtube.com" | "m.youtube.com") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?
    } else {
        return None;
    };

    (!id.is_empty()).then_some(id)
}

/// High-quality thumbnail URL of a YouTube video link
pub fn video_thumbnail(url: Option<&str>) -> Option<String> {
    let id = video_id(url?)?;
    Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id))
}

/// Classify a channel URL by its path
pub fn channel_ref(url: &str) -> Option<ChannelRef> {
    let parsed = Url::parse(url.trim()).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let last = segments.last()?.to_string();

    if segments.contains(&"channel") {
        Some(ChannelRef::Id(last))
    } else if segments.contains(&"user") {
        Some(ChannelRef::User(last))
    } else if segments.contains(&"c") {
        Some(ChannelRef::Custom(last))
    } else {
        None
    }
}

/// YouTube Data API client
#[derive(Clone)]
pub struct MetadataClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl MetadataClient {
    pub fn new(api_key: Option<String>) -> Result<Self, LookupError> {
        Self::with_base_url(api_key, YOUTUBE_API_BASE_URL)
    }

    /// Client against another API root (tests point this at a dead address)
    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.into(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Profile picture of the channel behind `url`, if it can be resolved
    pub async fn channel_avatar(&self, url: Option<&str>) -> Option<String> {
        let url = url?;
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No YouTube API key configured, skipping channel avatar");
            return None;
        };
        let channel = channel_ref(url)?;

        match self.lookup_avatar(api_key, &channel).await {
            Ok(avatar) => Some(avatar),
            Err(e) => {
                warn!(url, error = %e, "Channel avatar lookup failed");
                None
            }
        }
    }

    async fn lookup_avatar(&self, api_key: &str, channel: &ChannelRef) -> Result<String, LookupError> {
        let channel_id = match channel {
            ChannelRef::Id(id) => id.clone(),
            ChannelRef::User(name) => {
                let list: ItemList<ChannelIdItem> = self
                    .get_json("channels", &[("part", "id"), ("forUsername", name.as_str()), ("key", api_key)])
                    .await?;
                list.items.into_iter().next().ok_or(LookupError::NoMatch)?.id
            }
            ChannelRef::Custom(name) => {
                let list: ItemList<SearchItem> = self
                    .get_json(
                        "search",
                        &[("part", "snippet"), ("type", "channel"), ("q", name.as_str()), ("key", api_key)],
                    )
                    .await?;
                list.items
                    .into_iter()
                    .next()
                    .ok_or(LookupError::NoMatch)?
                    .snippet
                    .channel_id
            }
        };

        let list: ItemList<ChannelSnippetItem> = self
            .get_json("channels", &[("part", "snippet"), ("id", channel_id.as_str()), ("key", api_key)])
            .await?;

        let avatar = list
            .items
            .into_iter()
            .next()
            .ok_or(LookupError::NoMatch)?
            .snippet
            .thumbnails
            .high
            .url;

        debug!(channel_id = %channel_id, avatar = %avatar, "Resolved channel avatar");
        Ok(avatar)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Api(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }
}
