use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::IngestError;
use crate::ingest::Page;

use super::types::{RawChannel, RawCommentThread, RawPlaylist, RawPlaylistItem, RawVideo};

const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

/// Largest page the list endpoints accept.
const PAGE_SIZE: &str = "50";

/// The single-page fetch capability the orchestrator traverses. The real
/// implementation talks to the YouTube Data API; tests substitute scripted
/// fakes.
#[allow(async_fn_in_trait)]
pub trait YouTubeApi {
    async fn channel(&self, channel_id: &str) -> Result<RawChannel, IngestError>;

    async fn playlists(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawPlaylist>, IngestError>;

    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawPlaylistItem>, IngestError>;

    /// Fetch full details for up to 50 video ids in one call. Ids absent
    /// from the response no longer exist upstream.
    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<RawVideo>, IngestError>;

    async fn comment_threads(
        &self,
        video_id: &str,
        cursor: Option<&str>,
        max_results: u32,
    ) -> Result<Page<RawCommentThread>, IngestError>;
}

// Every list endpoint wraps its items in the same envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("yt-harvest/0.1")
            .build()
            .expect("Failed to create HTTP client");
        let base_url = Url::parse(API_BASE_URL).expect("valid API base URL");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<ListResponse<T>, IngestError> {
        let url = self
            .base_url
            .join(resource)
            .map_err(|e| IngestError::MalformedRecord(format!("bad endpoint {resource}: {e}")))?;

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(resource, status, &body));
        }

        response
            .json::<ListResponse<T>>()
            .await
            .map_err(|e| IngestError::MalformedRecord(format!("{resource} response: {e}")))
    }
}

impl YouTubeApi for YouTubeClient {
    async fn channel(&self, channel_id: &str) -> Result<RawChannel, IngestError> {
        let response: ListResponse<RawChannel> = self
            .get_list(
                "channels",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", channel_id),
                ],
            )
            .await?;

        // The channels endpoint reports an unknown id as an empty item list,
        // not as HTTP 404.
        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::NotFound(format!("channel {channel_id}")))
    }

    async fn playlists(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawPlaylist>, IngestError> {
        let mut params = vec![
            ("part", "snippet"),
            ("channelId", channel_id),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }
        let response: ListResponse<RawPlaylist> = self.get_list("playlists", &params).await?;
        Ok(Page {
            items: response.items,
            next_cursor: response.next_page_token,
        })
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawPlaylistItem>, IngestError> {
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }
        let response: ListResponse<RawPlaylistItem> =
            self.get_list("playlistItems", &params).await?;
        Ok(Page {
            items: response.items,
            next_cursor: response.next_page_token,
        })
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<RawVideo>, IngestError> {
        let ids = video_ids.join(",");
        let response: ListResponse<RawVideo> = self
            .get_list(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", ids.as_str()),
                ],
            )
            .await?;
        Ok(response.items)
    }

    async fn comment_threads(
        &self,
        video_id: &str,
        cursor: Option<&str>,
        max_results: u32,
    ) -> Result<Page<RawCommentThread>, IngestError> {
        let max_results = max_results.clamp(1, 100).to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }
        let response: ListResponse<RawCommentThread> =
            self.get_list("commentThreads", &params).await?;
        Ok(Page {
            items: response.items,
            next_cursor: response.next_page_token,
        })
    }
}

fn classify_transport(err: reqwest::Error) -> IngestError {
    // Timeouts, connection resets and friends are all worth a retry.
    IngestError::Transient(err.to_string())
}

fn classify_status(resource: &str, status: StatusCode, body: &str) -> IngestError {
    let detail = body.chars().take(200).collect::<String>();
    match status {
        StatusCode::NOT_FOUND => IngestError::NotFound(format!("{resource}: {detail}")),
        // 403 covers quota exhaustion and rate limiting on this API.
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            IngestError::Transient(format!("{resource} HTTP {status}: {detail}"))
        }
        s if s.is_server_error() => {
            IngestError::Transient(format!("{resource} HTTP {status}: {detail}"))
        }
        _ => IngestError::MalformedRecord(format!("{resource} unexpected HTTP {status}: {detail}")),
    }
}
