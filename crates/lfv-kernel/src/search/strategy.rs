//! The strategy seam of the search cascade.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::SearchHit;
use super::error::SearchResult;

/// One way of answering a search.
///
/// The engine calls `probe` first and skips the strategy when it returns
/// false. `execute` must honor both the deadline and the cancellation token;
/// on cancellation it returns whatever it has collected so far.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Short name reported back as `searchStrategy`.
    fn name(&self) -> &str;

    /// Whether the strategy can run on this host right now.
    async fn probe(&self) -> bool;

    /// Run the search under `root`. Paths in the hits are relative to `root`.
    async fn execute(
        &self,
        query: &str,
        root: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<SearchHit>>;
}
