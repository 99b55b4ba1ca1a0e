use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical channel record, keyed by the API's channel id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    pub name: String,
    pub subscriber_count: i64,
    pub view_count: i64,
    pub description: String,
    /// The channel's implicit "uploads" playlist, if the API exposes one.
    pub uploads_playlist_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: String,
    pub channel_id: String,
    pub name: String,
}

/// Canonical video record. The persistence parent is the channel, not the
/// playlist the video was discovered through: the same video can show up in
/// several playlists of the same channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub video_id: String,
    pub channel_id: String,
    pub name: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub view_count: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
    pub comment_count: i64,
    /// Elapsed duration in seconds, normalized from the API's ISO-8601 form.
    pub duration_seconds: i64,
    pub thumbnail_url: Option<String>,
    pub caption_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub video_id: String,
    pub author: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
}
