//! The search cascade.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::error::{SearchError, SearchResult};
use super::strategy::SearchStrategy;
use super::{
    FindStrategy, MemoryStrategy, RipgrepStrategy, SearchHit, SearchResponse, SearchType,
};
use crate::config::SearchConfig;
use crate::tree::DirectoryTree;
use crate::vfs::Sandbox;

/// Runs searches through the ordered strategy lists.
pub struct SearchEngine {
    sandbox: Arc<Sandbox>,
    content: Vec<Arc<dyn SearchStrategy>>,
    filename: Vec<Arc<dyn SearchStrategy>>,
    config: SearchConfig,
}

impl SearchEngine {
    /// Standard cascade: ripgrep for content; find, then memory, for names.
    /// Strategies switched off in `config` are left out.
    pub fn new(sandbox: Arc<Sandbox>, tree: Arc<DirectoryTree>, config: SearchConfig) -> Self {
        let mut content: Vec<Arc<dyn SearchStrategy>> = Vec::new();
        if config.use_ripgrep {
            content.push(Arc::new(RipgrepStrategy::new()));
        }

        let mut filename: Vec<Arc<dyn SearchStrategy>> = Vec::new();
        if config.use_find {
            filename.push(Arc::new(FindStrategy::new()));
        }
        if config.use_memory_search {
            filename.push(Arc::new(MemoryStrategy::new(tree, config.max_memory_entries)));
        }

        Self::with_strategies(sandbox, config, content, filename)
    }

    /// Build an engine with explicit strategy lists.
    pub fn with_strategies(
        sandbox: Arc<Sandbox>,
        config: SearchConfig,
        content: Vec<Arc<dyn SearchStrategy>>,
        filename: Vec<Arc<dyn SearchStrategy>>,
    ) -> Self {
        Self {
            sandbox,
            content,
            filename,
            config,
        }
    }

    /// Ordered strategies for a search type.
    pub fn strategies(&self, search_type: SearchType) -> &[Arc<dyn SearchStrategy>] {
        match search_type {
            SearchType::Content => &self.content,
            SearchType::Filename => &self.filename,
        }
    }

    /// Search under `dir` (the base directory when `None`).
    ///
    /// The directory is resolved inside the sandbox root before any strategy
    /// runs. Cancelling `cancel` stops the running strategy and returns the
    /// results gathered so far.
    #[tracing::instrument(skip(self, cancel), fields(strategy))]
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        dir: Option<&str>,
        cancel: &CancellationToken,
    ) -> SearchResult<SearchResponse> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".into()));
        }

        let root = match dir {
            Some(dir) => self.sandbox.resolve_within_root(dir, true)?,
            None => self.sandbox.base(),
        };

        let strategies = self.strategies(search_type);
        let mut last_error = None;
        let mut empty_from = None;

        for (i, strategy) in strategies.iter().enumerate() {
            let name = strategy.name();
            let is_last = i + 1 == strategies.len();

            if !strategy.probe().await {
                tracing::debug!(strategy = name, "strategy unavailable");
                last_error = Some(SearchError::unavailable(name));
                continue;
            }

            match strategy
                .execute(query, &root, self.config.timeout, cancel)
                .await
            {
                Ok(hits) if hits.is_empty() && !is_last => {
                    tracing::debug!(strategy = name, "no results, falling through");
                    empty_from.get_or_insert(name);
                }
                Ok(hits) => {
                    tracing::Span::current().record("strategy", name);
                    return Ok(self.finish(hits, name));
                }
                Err(e) => {
                    tracing::warn!(strategy = name, error = %e, "search strategy failed");
                    last_error = Some(e);
                }
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        if let Some(name) = empty_from {
            return Ok(self.finish(Vec::new(), name));
        }
        Err(last_error.unwrap_or_else(|| SearchError::Exhausted(search_type.to_string())))
    }

    /// Dedupe by path (first wins) and cap the result count.
    fn finish(&self, hits: Vec<SearchHit>, strategy: &str) -> SearchResponse {
        let mut seen = HashSet::new();
        let mut results: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| seen.insert(hit.path.clone()))
            .collect();
        results.truncate(self.config.max_results);

        tracing::debug!(strategy, count = results.len(), "search finished");
        SearchResponse {
            total_results: results.len(),
            results,
            search_strategy: strategy.to_string(),
        }
    }
}
