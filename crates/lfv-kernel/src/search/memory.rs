//! Filename search over the cached directory tree.
//!
//! Always available; used when `find` is missing, fails or finds nothing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::{SearchError, SearchResult};
use super::strategy::SearchStrategy;
use super::{MatchType, SearchHit};
use crate::tree::{DirectoryTree, UNBOUNDED};
use crate::vfs::WalkDirItem;

pub struct MemoryStrategy {
    tree: Arc<DirectoryTree>,
    max_entries: usize,
}

impl MemoryStrategy {
    pub fn new(tree: Arc<DirectoryTree>, max_entries: usize) -> Self {
        Self { tree, max_entries }
    }
}

#[async_trait]
impl SearchStrategy for MemoryStrategy {
    fn name(&self) -> &str {
        "memory"
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        query: &str,
        root: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<SearchHit>> {
        let walked = tokio::select! {
            walked = tokio::time::timeout(timeout, self.tree.walk(root, UNBOUNDED)) => match walked {
                Ok(walked) => walked?,
                Err(_) => {
                    return Err(SearchError::Timeout {
                        tool: self.name().to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            },
            _ = cancel.cancelled() => return Ok(Vec::new()),
        };

        Ok(match_names(&walked, &query.to_lowercase(), self.max_entries))
    }
}

/// Depth-first over the walked tree; the root itself is not a candidate.
fn match_names(root: &WalkDirItem, needle: &str, max_entries: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut visited = 0usize;
    let mut stack: Vec<(String, &WalkDirItem)> = root
        .children()
        .iter()
        .rev()
        .map(|child| (child.name.clone(), child))
        .collect();

    while let Some((path, item)) = stack.pop() {
        visited += 1;
        if visited > max_entries {
            tracing::debug!(max_entries, "memory search entry limit reached");
            break;
        }

        if item.name.to_lowercase().contains(needle) {
            hits.push(SearchHit {
                file: item.name.clone(),
                path: path.clone(),
                is_directory: item.is_directory,
                match_type: MatchType::Filename,
                line: None,
                text: None,
            });
        }

        for child in item.children().iter().rev() {
            stack.push((format!("{path}/{}", child.name), child));
        }
    }

    hits
}
