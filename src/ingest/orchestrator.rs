use std::collections::HashSet;

use futures::stream::{self, StreamExt};

use crate::api::YouTubeApi;
use crate::db::Repository;
use crate::error::IngestError;
use crate::models::{EntityKind, IngestReport, Video};

use super::normalizer;
use super::paginator::{PageError, Paginator};
use super::retry::with_retry;
use super::{CancelFlag, IngestOptions};

/// The videos endpoint accepts at most this many ids per call.
const DETAILS_BATCH: usize = 50;

/// Drives the four-level traversal for one channel: channel, then its
/// playlists, then each playlist's videos, then each video's comments,
/// depth-first within a video's subtree.
///
/// Failure policy: a channel that cannot be ingested aborts the run, since
/// every other row would dangle under it. Everything else is isolated to
/// the offending entity; siblings keep going and the aggregate report
/// carries the tally.
pub struct Orchestrator<'a, A> {
    api: &'a A,
    store: &'a Repository,
    opts: &'a IngestOptions,
    cancel: CancelFlag,
}

impl<'a, A: YouTubeApi> Orchestrator<'a, A> {
    pub fn new(api: &'a A, store: &'a Repository, opts: &'a IngestOptions, cancel: CancelFlag) -> Self {
        Self {
            api,
            store,
            opts,
            cancel,
        }
    }

    pub async fn run(&self, channel_id: &str) -> IngestReport {
        let mut report = IngestReport::for_channel(channel_id);
        tracing::info!("starting ingestion for channel {}", channel_id);

        // FetchingChannel
        let channel = match with_retry(&self.opts.retry, || self.api.channel(channel_id))
            .await
            .and_then(normalizer::normalize_channel)
        {
            Ok(channel) => channel,
            Err(err) => {
                tracing::error!("channel {} could not be fetched: {}", channel_id, err);
                report.record_failure(EntityKind::Channel, channel_id, &err);
                report.aborted = true;
                return report;
            }
        };
        let uploads_playlist_id = channel.uploads_playlist_id.clone();

        if let Err(err) = with_retry(&self.opts.retry, || {
            let channel = channel.clone();
            async move { self.store.upsert_channel(channel).await }
        })
        .await
        {
            // Without the channel row, every child upsert would dangle.
            tracing::error!("channel {} could not be persisted: {}", channel_id, err);
            report.record_failure(EntityKind::Channel, channel_id, &err);
            report.aborted = true;
            return report;
        }
        report.record_success(EntityKind::Channel);

        // FetchingPlaylists
        let playlist_ids = self.collect_playlists(channel_id, &mut report).await;

        // FetchingVideos / FetchingComments. The uploads playlist goes
        // first: its videos persist under the channel, no playlist row
        // needed. Listed playlists follow in API return order.
        let mut traversal = Vec::new();
        if let Some(uploads) = uploads_playlist_id {
            traversal.push(uploads);
        }
        for playlist_id in playlist_ids {
            if !traversal.contains(&playlist_id) {
                traversal.push(playlist_id);
            }
        }

        let mut seen_videos = HashSet::new();
        for playlist_id in &traversal {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.process_playlist(playlist_id, &mut seen_videos, &mut report)
                .await;
        }

        tracing::info!(
            "ingestion for channel {} finished: {} videos, {} comments, {} failures{}",
            channel_id,
            report.videos.succeeded,
            report.comments.succeeded,
            report.total_failed(),
            if report.cancelled { " (cancelled)" } else { "" },
        );
        report
    }

    /// Drain all playlist pages, upserting each playlist in return order.
    /// One bad playlist never aborts the batch.
    async fn collect_playlists(&self, channel_id: &str, report: &mut IngestReport) -> Vec<String> {
        let mut playlist_ids = Vec::new();
        let mut pager = Paginator::new(|cursor: Option<String>| async move {
            with_retry(&self.opts.retry, || {
                self.api.playlists(channel_id, cursor.as_deref())
            })
            .await
        });

        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let batch = match pager.next_page().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        "playlist page for {} failed at cursor {:?}: {}",
                        channel_id,
                        err.cursor,
                        err.source
                    );
                    report.record_failure(
                        EntityKind::Playlist,
                        &page_label(channel_id, &err),
                        &err.source,
                    );
                    break;
                }
            };

            for raw in batch {
                let fallback_id = raw.id.clone().unwrap_or_else(|| "<unknown>".to_string());
                let playlist = match normalizer::normalize_playlist(raw, channel_id) {
                    Ok(playlist) => playlist,
                    Err(err) => {
                        report.record_failure(EntityKind::Playlist, &fallback_id, &err);
                        continue;
                    }
                };
                let playlist_id = playlist.playlist_id.clone();
                match with_retry(&self.opts.retry, || {
                    let playlist = playlist.clone();
                    async move { self.store.upsert_playlist(playlist).await }
                })
                .await
                {
                    Ok(()) => {
                        report.record_success(EntityKind::Playlist);
                        playlist_ids.push(playlist_id);
                    }
                    Err(err) => report.record_failure(EntityKind::Playlist, &playlist_id, &err),
                }
            }
        }
        playlist_ids
    }

    /// Walk one playlist's membership pages and ingest every video not yet
    /// visited this run. The uploads playlist overlaps topical playlists,
    /// so a video key is never dispatched twice.
    async fn process_playlist(
        &self,
        playlist_id: &str,
        seen: &mut HashSet<String>,
        report: &mut IngestReport,
    ) {
        let mut pager = Paginator::new(|cursor: Option<String>| async move {
            with_retry(&self.opts.retry, || {
                self.api.playlist_items(playlist_id, cursor.as_deref())
            })
            .await
        });

        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }
            let batch = match pager.next_page().await {
                Ok(Some(batch)) => batch,
                Ok(None) => return,
                Err(err) => {
                    tracing::warn!(
                        "items page for playlist {} failed at cursor {:?}: {}",
                        playlist_id,
                        err.cursor,
                        err.source
                    );
                    report.record_failure(
                        EntityKind::Video,
                        &page_label(playlist_id, &err),
                        &err.source,
                    );
                    return;
                }
            };

            let mut pending = Vec::new();
            for item in &batch {
                match normalizer::video_id_of(item) {
                    Ok(video_id) => {
                        if seen.insert(video_id.clone()) {
                            pending.push(video_id);
                        }
                    }
                    Err(err) => report.record_failure(EntityKind::Video, "<unknown>", &err),
                }
            }

            for chunk in pending.chunks(DETAILS_BATCH) {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    return;
                }
                self.process_video_batch(chunk, report).await;
            }
        }
    }

    /// Fetch details for one id batch, then run each video's subtree on the
    /// bounded worker pool. Subtrees touch disjoint keys, so they are safe
    /// to run concurrently; each one finishes its own comments before it
    /// reports done.
    async fn process_video_batch(&self, ids: &[String], report: &mut IngestReport) {
        let raw_videos = match with_retry(&self.opts.retry, || self.api.video_details(ids)).await {
            Ok(videos) => videos,
            Err(err) => {
                for id in ids {
                    report.record_failure(EntityKind::Video, id, &err);
                }
                return;
            }
        };

        // Ids the response skipped are gone upstream.
        let missing: Vec<&String> = {
            let returned: HashSet<&str> =
                raw_videos.iter().filter_map(|raw| raw.id.as_deref()).collect();
            ids.iter()
                .filter(|id| !returned.contains(id.as_str()))
                .collect()
        };
        for id in missing {
            report.record_failure(
                EntityKind::Video,
                id,
                &IngestError::NotFound(format!("video {id} absent from details response")),
            );
        }

        let mut videos = Vec::new();
        for raw in raw_videos {
            let fallback_id = raw.id.clone().unwrap_or_else(|| "<unknown>".to_string());
            match normalizer::normalize_video(raw) {
                Ok(video) => videos.push(video),
                Err(err) => report.record_failure(EntityKind::Video, &fallback_id, &err),
            }
        }

        let partials: Vec<IngestReport> = stream::iter(videos)
            .map(|video| self.ingest_video_subtree(video))
            .buffer_unordered(self.opts.concurrency_limit.max(1))
            .collect()
            .await;
        for partial in partials {
            report.merge(partial);
        }
    }

    /// Depth-first subtree: upsert the video, then drain its comments. The
    /// subtree returns a partial report the caller merges.
    async fn ingest_video_subtree(&self, video: Video) -> IngestReport {
        let mut report = IngestReport::default();
        let video_id = video.video_id.clone();

        match with_retry(&self.opts.retry, || {
            let video = video.clone();
            async move { self.store.upsert_video(video).await }
        })
        .await
        {
            Ok(()) => report.record_success(EntityKind::Video),
            Err(err) => {
                // Comments under an unpersisted video would dangle.
                report.record_failure(EntityKind::Video, &video_id, &err);
                return report;
            }
        }

        self.ingest_comments(&video_id, &mut report).await;
        report
    }

    async fn ingest_comments(&self, video_id: &str, report: &mut IngestReport) {
        let limit = self.opts.max_comments_per_video as usize;
        if limit == 0 {
            return;
        }
        let max_results = self.opts.max_comments_per_video.min(100);
        let mut pager = Paginator::new(|cursor: Option<String>| async move {
            with_retry(&self.opts.retry, || {
                self.api
                    .comment_threads(video_id, cursor.as_deref(), max_results)
            })
            .await
        });

        let mut handled = 0usize;
        'pages: loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }
            // The bound may land exactly on a page boundary; do not spend a
            // quota unit fetching a page just to discard it.
            if handled >= limit {
                break;
            }
            let batch = match pager.next_page().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        "comment page for video {} failed at cursor {:?}: {}",
                        video_id,
                        err.cursor,
                        err.source
                    );
                    report.record_failure(
                        EntityKind::Comment,
                        &page_label(video_id, &err),
                        &err.source,
                    );
                    break;
                }
            };

            for raw in batch {
                if handled >= limit {
                    break 'pages;
                }
                handled += 1;
                let comment_id = raw.id.clone().unwrap_or_else(|| "<unknown>".to_string());
                match normalizer::normalize_comment(raw, video_id) {
                    Ok(comment) => {
                        match with_retry(&self.opts.retry, || {
                            let comment = comment.clone();
                            async move { self.store.upsert_comment(comment).await }
                        })
                        .await
                        {
                            Ok(()) => report.record_success(EntityKind::Comment),
                            Err(err) => {
                                report.record_failure(EntityKind::Comment, &comment_id, &err)
                            }
                        }
                    }
                    Err(err) => report.record_failure(EntityKind::Comment, &comment_id, &err),
                }
            }
        }
    }
}

fn page_label(parent_id: &str, err: &PageError) -> String {
    format!("{parent_id}@{}", err.cursor.as_deref().unwrap_or("start"))
}
