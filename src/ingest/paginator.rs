use std::future::Future;

use crate::error::IngestError;

/// One batch of items from a paginated capability, plus the opaque cursor
/// for the page after it when more remain.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// A failed page fetch, pinned to the cursor that was being fetched so a
/// caller can persist it and resume without replaying earlier pages.
#[derive(Debug)]
pub struct PageError {
    pub cursor: Option<String>,
    pub source: IngestError,
}

/// Turns a single-page fetch capability into a lazy, finite, restartable
/// sequence of item batches.
///
/// The paginator never assumes a page size: it hands back whatever the
/// capability returned and stops once a page arrives without a next cursor.
pub struct Paginator<F> {
    fetch: F,
    cursor: Option<String>,
    exhausted: bool,
}

impl<F> Paginator<F> {
    /// Start from the first page.
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            cursor: None,
            exhausted: false,
        }
    }

    /// Resume from a cursor persisted by an earlier run. `None` is the
    /// first page again.
    #[allow(dead_code)]
    pub fn resume(fetch: F, cursor: Option<String>) -> Self {
        Self {
            fetch,
            cursor,
            exhausted: false,
        }
    }

    /// The cursor the next `next_page` call will fetch.
    #[allow(dead_code)]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    #[allow(dead_code)]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<T, F, Fut> Paginator<F>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, IngestError>>,
{
    /// Fetch the next batch, or `None` once the sequence is drained.
    ///
    /// On failure the cursor does not advance, so retrying `next_page` (or
    /// resuming a fresh paginator at `cursor()`) re-fetches only the failed
    /// page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, PageError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = (self.fetch)(self.cursor.clone())
            .await
            .map_err(|source| PageError {
                cursor: self.cursor.clone(),
                source,
            })?;

        match page.next_cursor {
            Some(token) => self.cursor = Some(token),
            None => self.exhausted = true,
        }
        Ok(Some(page.items))
    }
}
