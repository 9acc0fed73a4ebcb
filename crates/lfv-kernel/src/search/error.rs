//! Search error types.

use thiserror::Error;

use crate::vfs::VfsError;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Empty or otherwise unusable query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The search root failed sandbox resolution.
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// The external program is not installed or not on PATH.
    #[error("{tool} is not available")]
    ToolUnavailable { tool: String },

    /// The program ran but failed without producing results.
    #[error("{tool} failed: {message}")]
    ToolFailure { tool: String, message: String },

    /// The program was killed at its deadline.
    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    /// No strategy was configured for the requested search type.
    #[error("no search strategy available for {0} search")]
    Exhausted(String),
}

impl SearchError {
    pub fn unavailable(tool: &str) -> Self {
        Self::ToolUnavailable {
            tool: tool.to_string(),
        }
    }

    pub fn failure(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolFailure {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Caller mistakes (bad query, bad directory) as opposed to host failures.
    pub fn is_client_error(&self) -> bool {
        match self {
            SearchError::InvalidQuery(_) => true,
            SearchError::Vfs(e) => e.is_client_error(),
            _ => false,
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
