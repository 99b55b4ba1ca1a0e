//! Pure raw-payload to canonical-record conversion. Nothing here touches
//! storage or the network.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::api::types::{
    RawChannel, RawCommentThread, RawPlaylist, RawPlaylistItem, RawVideo, Thumbnails,
};
use crate::error::IngestError;
use crate::models::{Channel, Comment, Playlist, Video};

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

fn missing(entity: &str, field: &str) -> IngestError {
    IngestError::MalformedRecord(format!("{entity}: missing {field}"))
}

pub fn normalize_channel(raw: RawChannel) -> Result<Channel, IngestError> {
    let channel_id = raw.id.ok_or_else(|| missing("channel", "id"))?;
    let snippet = raw.snippet.ok_or_else(|| missing("channel", "snippet"))?;
    let name = snippet.title.ok_or_else(|| missing("channel", "title"))?;
    let statistics = raw.statistics.unwrap_or_default();

    Ok(Channel {
        channel_id,
        name,
        subscriber_count: parse_count("channel", statistics.subscriber_count)?,
        view_count: parse_count("channel", statistics.view_count)?,
        description: snippet.description,
        uploads_playlist_id: raw
            .content_details
            .and_then(|details| details.related_playlists)
            .and_then(|playlists| playlists.uploads),
    })
}

pub fn normalize_playlist(raw: RawPlaylist, channel_id: &str) -> Result<Playlist, IngestError> {
    let playlist_id = raw.id.ok_or_else(|| missing("playlist", "id"))?;
    let name = raw
        .snippet
        .and_then(|snippet| snippet.title)
        .ok_or_else(|| missing("playlist", "title"))?;

    Ok(Playlist {
        playlist_id,
        channel_id: channel_id.to_string(),
        name,
    })
}

/// Extract the video id a playlist item points at.
pub fn video_id_of(item: &RawPlaylistItem) -> Result<String, IngestError> {
    item.snippet
        .as_ref()
        .and_then(|snippet| snippet.resource_id.as_ref())
        .and_then(|resource| resource.video_id.clone())
        .ok_or_else(|| missing("playlist item", "resourceId.videoId"))
}

pub fn normalize_video(raw: RawVideo) -> Result<Video, IngestError> {
    let video_id = raw.id.ok_or_else(|| missing("video", "id"))?;
    let snippet = raw.snippet.ok_or_else(|| missing("video", "snippet"))?;
    let name = snippet.title.ok_or_else(|| missing("video", "title"))?;
    let channel_id = snippet
        .channel_id
        .ok_or_else(|| missing("video", "channelId"))?;
    let published_at = snippet
        .published_at
        .ok_or_else(|| missing("video", "publishedAt"))?;
    let details = raw
        .content_details
        .ok_or_else(|| missing("video", "contentDetails"))?;
    let duration = details
        .duration
        .ok_or_else(|| missing("video", "duration"))?;
    let caption_status = details.caption.ok_or_else(|| missing("video", "caption"))?;
    let statistics = raw.statistics.unwrap_or_default();

    Ok(Video {
        thumbnail_url: best_thumbnail(snippet.thumbnails),
        video_id,
        channel_id,
        name,
        description: snippet.description,
        published_at: parse_timestamp("video", &published_at)?,
        view_count: parse_count("video", statistics.view_count)?,
        like_count: parse_count("video", statistics.like_count)?,
        dislike_count: parse_count("video", statistics.dislike_count)?,
        favorite_count: parse_count("video", statistics.favorite_count)?,
        comment_count: parse_count("video", statistics.comment_count)?,
        duration_seconds: parse_iso8601_duration(&duration)?,
        caption_status,
    })
}

pub fn normalize_comment(raw: RawCommentThread, video_id: &str) -> Result<Comment, IngestError> {
    let comment_id = raw.id.ok_or_else(|| missing("comment", "id"))?;
    let snippet = raw
        .snippet
        .and_then(|thread| thread.top_level_comment)
        .and_then(|comment| comment.snippet)
        .ok_or_else(|| missing("comment", "topLevelComment.snippet"))?;
    let author = snippet
        .author_display_name
        .ok_or_else(|| missing("comment", "authorDisplayName"))?;
    let text = snippet
        .text_display
        .ok_or_else(|| missing("comment", "textDisplay"))?;
    let published_at = snippet
        .published_at
        .ok_or_else(|| missing("comment", "publishedAt"))?;

    Ok(Comment {
        comment_id,
        video_id: video_id.to_string(),
        author,
        text,
        published_at: parse_timestamp("comment", &published_at)?,
    })
}

/// Counters come over the wire as decimal strings. Absent counters (e.g. a
/// hidden dislike count) default to zero instead of failing the record.
fn parse_count(entity: &str, value: Option<String>) -> Result<i64, IngestError> {
    match value {
        None => Ok(0),
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            IngestError::MalformedRecord(format!("{entity}: counter {raw:?} is not an integer"))
        }),
    }
}

fn parse_timestamp(entity: &str, raw: &str) -> Result<DateTime<Utc>, IngestError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| IngestError::MalformedRecord(format!("{entity}: bad timestamp {raw:?}")))
}

/// Parse an ISO-8601 duration like `PT5M30S` or `P1DT2H` into elapsed
/// seconds. Stored durations are elapsed time, never a time of day.
pub fn parse_iso8601_duration(raw: &str) -> Result<i64, IngestError> {
    let re = DURATION_RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
            .expect("valid duration regex")
    });

    let captures = re
        .captures(raw)
        .ok_or_else(|| IngestError::MalformedRecord(format!("bad ISO-8601 duration {raw:?}")))?;

    let mut total: i64 = 0;
    for (idx, scale) in [(1, 86_400), (2, 3_600), (3, 60), (4, 1)] {
        let Some(m) = captures.get(idx) else {
            continue;
        };
        total = m
            .as_str()
            .parse::<i64>()
            .ok()
            .and_then(|value| value.checked_mul(scale))
            .and_then(|value| total.checked_add(value))
            .ok_or_else(|| {
                IngestError::MalformedRecord(format!("duration out of range {raw:?}"))
            })?;
    }

    Ok(total)
}

fn best_thumbnail(thumbnails: Option<Thumbnails>) -> Option<String> {
    let t = thumbnails?;
    // Deterministic pick: highest resolution the API offered.
    [t.maxres, t.standard, t.high, t.medium, t.default]
        .into_iter()
        .flatten()
        .next()
        .map(|thumb| thumb.url)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_iso8601_duration("PT5M30S").unwrap(), 330);
        assert_eq!(parse_iso8601_duration("PT1H").unwrap(), 3600);
        assert_eq!(parse_iso8601_duration("P1DT2H3M4S").unwrap(), 93_784);
        assert_eq!(parse_iso8601_duration("PT0S").unwrap(), 0);
        assert_eq!(parse_iso8601_duration("P0D").unwrap(), 0);
        assert!(parse_iso8601_duration("5 minutes").is_err());
        assert!(parse_iso8601_duration("PT5X").is_err());
    }

    #[test]
    fn absurd_duration_is_malformed_not_zero() {
        assert!(matches!(
            parse_iso8601_duration("PT99999999999999999999999S"),
            Err(IngestError::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_iso8601_duration("P106751991167301D"),
            Err(IngestError::MalformedRecord(_))
        ));
    }

    #[test]
    fn channel_counters_are_coerced_from_strings() {
        let raw: RawChannel = serde_json::from_value(json!({
            "id": "C1",
            "snippet": { "title": "Test Channel", "description": "about" },
            "statistics": { "subscriberCount": "1200", "viewCount": "34000" },
            "contentDetails": { "relatedPlaylists": { "uploads": "P1" } }
        }))
        .unwrap();

        let channel = normalize_channel(raw).unwrap();
        assert_eq!(channel.subscriber_count, 1200);
        assert_eq!(channel.view_count, 34_000);
        assert_eq!(channel.uploads_playlist_id.as_deref(), Some("P1"));
    }

    #[test]
    fn channel_without_title_is_malformed() {
        let raw: RawChannel = serde_json::from_value(json!({
            "id": "C1",
            "snippet": { "description": "no title here" }
        }))
        .unwrap();
        assert!(matches!(
            normalize_channel(raw),
            Err(IngestError::MalformedRecord(_))
        ));
    }

    #[test]
    fn video_hidden_dislike_count_defaults_to_zero() {
        let raw: RawVideo = serde_json::from_value(json!({
            "id": "V1",
            "snippet": {
                "title": "A video",
                "channelId": "C1",
                "publishedAt": "2022-03-01T10:00:00Z",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/vi/V1/default.jpg" },
                    "high": { "url": "https://i.ytimg.com/vi/V1/hqdefault.jpg" }
                }
            },
            "statistics": { "viewCount": "100", "likeCount": "10" },
            "contentDetails": { "duration": "PT5M30S", "caption": "false" }
        }))
        .unwrap();

        let video = normalize_video(raw).unwrap();
        assert_eq!(video.dislike_count, 0);
        assert_eq!(video.favorite_count, 0);
        assert_eq!(video.duration_seconds, 330);
        assert_eq!(video.published_at.to_rfc3339(), "2022-03-01T10:00:00+00:00");
        // Highest available resolution wins: no maxres/standard, so high.
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/V1/hqdefault.jpg")
        );
    }

    #[test]
    fn video_without_duration_is_malformed() {
        let raw: RawVideo = serde_json::from_value(json!({
            "id": "V1",
            "snippet": {
                "title": "A video",
                "channelId": "C1",
                "publishedAt": "2022-03-01T10:00:00Z"
            },
            "contentDetails": { "caption": "false" }
        }))
        .unwrap();
        assert!(matches!(
            normalize_video(raw),
            Err(IngestError::MalformedRecord(_))
        ));
    }

    #[test]
    fn non_numeric_counter_is_malformed() {
        let raw: RawVideo = serde_json::from_value(json!({
            "id": "V1",
            "snippet": {
                "title": "A video",
                "channelId": "C1",
                "publishedAt": "2022-03-01T10:00:00Z"
            },
            "statistics": { "viewCount": "lots" },
            "contentDetails": { "duration": "PT1M", "caption": "false" }
        }))
        .unwrap();
        assert!(normalize_video(raw).is_err());
    }

    #[test]
    fn comment_thread_unwraps_top_level_comment() {
        let raw: RawCommentThread = serde_json::from_value(json!({
            "id": "X1",
            "snippet": {
                "topLevelComment": {
                    "snippet": {
                        "authorDisplayName": "viewer",
                        "textDisplay": "nice one",
                        "publishedAt": "2023-07-04T12:00:00Z"
                    }
                }
            }
        }))
        .unwrap();

        let comment = normalize_comment(raw, "V1").unwrap();
        assert_eq!(comment.video_id, "V1");
        assert_eq!(comment.author, "viewer");
        assert_eq!(comment.text, "nice one");
    }

    #[test]
    fn playlist_item_yields_video_id() {
        let item: RawPlaylistItem = serde_json::from_value(json!({
            "snippet": { "resourceId": { "videoId": "V9" } }
        }))
        .unwrap();
        assert_eq!(video_id_of(&item).unwrap(), "V9");

        let empty: RawPlaylistItem = serde_json::from_value(json!({})).unwrap();
        assert!(video_id_of(&empty).is_err());
    }
}
