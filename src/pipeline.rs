//! Top-level composition: wires the API client, normalizer and store into
//! the orchestrator for a single channel run. No business logic lives here
//! beyond the run-level timeout.

use crate::api::YouTubeApi;
use crate::db::Repository;
use crate::ingest::{CancelFlag, IngestOptions, Orchestrator};
use crate::models::IngestReport;

/// Run one full ingestion for `channel_id` and return the aggregate report.
///
/// The timeout is expressed as cancellation rather than dropping the run,
/// so whatever was ingested before the deadline still shows up in the
/// report (and in the store).
pub async fn run_ingestion<A: YouTubeApi>(
    api: &A,
    store: &Repository,
    channel_id: &str,
    opts: &IngestOptions,
    cancel: CancelFlag,
) -> IngestReport {
    let deadline = {
        let cancel = cancel.clone();
        let timeout = opts.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!("ingestion timed out after {:?}, cancelling run", timeout);
            cancel.cancel();
        })
    };

    let report = Orchestrator::new(api, store, opts, cancel)
        .run(channel_id)
        .await;

    deadline.abort();
    report
}
