use std::fmt;

use crate::error::IngestError;

/// Cap on the failure reasons kept in a report; counts keep accumulating
/// past this, the detail list does not.
const MAX_RECORDED_FAILURES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Channel,
    Playlist,
    Video,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Channel => write!(f, "channel"),
            EntityKind::Playlist => write!(f, "playlist"),
            EntityKind::Video => write!(f, "video"),
            EntityKind::Comment => write!(f, "comment"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: EntityKind,
    pub entity_id: String,
    pub reason: String,
}

/// Aggregate outcome of one ingestion run. Branch workers build partial
/// reports that get merged back into the run-level one.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub channel_id: String,
    pub channels: KindStats,
    pub playlists: KindStats,
    pub videos: KindStats,
    pub comments: KindStats,
    pub failures: Vec<Failure>,
    /// Run stopped early because the channel itself could not be ingested.
    pub aborted: bool,
    /// Run was cancelled (signal or timeout); counts cover work done so far.
    pub cancelled: bool,
}

impl IngestReport {
    pub fn for_channel(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            ..Self::default()
        }
    }

    fn stats_mut(&mut self, kind: EntityKind) -> &mut KindStats {
        match kind {
            EntityKind::Channel => &mut self.channels,
            EntityKind::Playlist => &mut self.playlists,
            EntityKind::Video => &mut self.videos,
            EntityKind::Comment => &mut self.comments,
        }
    }

    pub fn stats(&self, kind: EntityKind) -> KindStats {
        match kind {
            EntityKind::Channel => self.channels,
            EntityKind::Playlist => self.playlists,
            EntityKind::Video => self.videos,
            EntityKind::Comment => self.comments,
        }
    }

    pub fn record_success(&mut self, kind: EntityKind) {
        let stats = self.stats_mut(kind);
        stats.attempted += 1;
        stats.succeeded += 1;
    }

    pub fn record_failure(&mut self, kind: EntityKind, entity_id: &str, err: &IngestError) {
        let stats = self.stats_mut(kind);
        stats.attempted += 1;
        stats.failed += 1;
        if self.failures.len() < MAX_RECORDED_FAILURES {
            self.failures.push(Failure {
                kind,
                entity_id: entity_id.to_string(),
                reason: err.to_string(),
            });
        }
    }

    /// Fold a branch worker's partial report into this one.
    pub fn merge(&mut self, other: IngestReport) {
        for kind in [
            EntityKind::Channel,
            EntityKind::Playlist,
            EntityKind::Video,
            EntityKind::Comment,
        ] {
            let theirs = other.stats(kind);
            let ours = self.stats_mut(kind);
            ours.attempted += theirs.attempted;
            ours.succeeded += theirs.succeeded;
            ours.failed += theirs.failed;
        }
        for failure in other.failures {
            if self.failures.len() >= MAX_RECORDED_FAILURES {
                break;
            }
            self.failures.push(failure);
        }
        self.aborted |= other.aborted;
        self.cancelled |= other.cancelled;
    }

    pub fn total_failed(&self) -> u64 {
        self.channels.failed + self.playlists.failed + self.videos.failed + self.comments.failed
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ingestion report for channel {}", self.channel_id)?;
        writeln!(f, "  {:<10} {:>9} {:>9} {:>7}", "kind", "attempted", "succeeded", "failed")?;
        for (label, stats) in [
            ("channels", self.channels),
            ("playlists", self.playlists),
            ("videos", self.videos),
            ("comments", self.comments),
        ] {
            writeln!(
                f,
                "  {:<10} {:>9} {:>9} {:>7}",
                label, stats.attempted, stats.succeeded, stats.failed
            )?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "  failures:")?;
            for failure in &self.failures {
                writeln!(f, "    {} {}: {}", failure.kind, failure.entity_id, failure.reason)?;
            }
        }
        if self.aborted {
            writeln!(f, "  run aborted: channel could not be ingested")?;
        }
        if self.cancelled {
            writeln!(f, "  run cancelled before completion; counts are partial")?;
        }
        Ok(())
    }
}
