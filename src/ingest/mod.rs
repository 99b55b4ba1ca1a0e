pub mod normalizer;
mod orchestrator;
mod paginator;
mod retry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use orchestrator::Orchestrator;
pub use paginator::{Page, PageError, Paginator};
pub use retry::{with_retry, RetryPolicy};

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Upper bound on top-level comments harvested per video.
    pub max_comments_per_video: u32,
    /// Width of the worker pool for video subtrees; also the effective cap
    /// on in-flight API calls, which are the scarce resource.
    pub concurrency_limit: usize,
    /// Whole-run budget; hitting it cancels the run and keeps the partial
    /// report.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_comments_per_video: 5,
            concurrency_limit: 4,
            timeout: Duration::from_secs(600),
            retry: RetryPolicy::default(),
        }
    }
}

/// Cooperative run-level cancellation. Setting it stops new page fetches
/// promptly; in-flight calls finish and the partial report is returned.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
