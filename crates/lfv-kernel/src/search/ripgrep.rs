//! Content search through `rg --json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::error::SearchResult;
use super::process::collect_lines;
use super::strategy::SearchStrategy;
use super::{MatchType, SearchHit, relative_display};

/// One line of `rg --json` output. Only `match` records carry data we use.
#[derive(Debug, Deserialize)]
struct RgMessage {
    #[serde(rename = "type")]
    kind: String,
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RgMatch {
    path: RgText,
    lines: RgText,
    line_number: Option<u64>,
}

/// rg reports non-UTF-8 data as `{"bytes": ...}` instead of `{"text": ...}`.
#[derive(Debug, Deserialize)]
struct RgText {
    text: Option<String>,
}

pub struct RipgrepStrategy {
    program: PathBuf,
}

impl RipgrepStrategy {
    pub fn new() -> Self {
        Self::with_program("rg")
    }

    /// Use a specific binary instead of `rg` from PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RipgrepStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchStrategy for RipgrepStrategy {
    fn name(&self) -> &str {
        "ripgrep"
    }

    async fn probe(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    async fn execute(
        &self,
        query: &str,
        root: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<SearchHit>> {
        let mut command = Command::new(&self.program);
        command
            .arg("--json")
            // one match per file; results are deduplicated by path anyway
            .arg("--max-count")
            .arg("1")
            .arg("--")
            .arg(query)
            .arg(root);

        collect_lines(self.name(), command, timeout, cancel, |line| {
            parse_match(line, root)
        })
        .await
    }
}

fn parse_match(line: &str, root: &Path) -> Option<SearchHit> {
    let message: RgMessage = serde_json::from_str(line).ok()?;
    if message.kind != "match" {
        return None;
    }
    let data: RgMatch = serde_json::from_value(message.data?).ok()?;

    let full = PathBuf::from(data.path.text?);
    let rel = full.strip_prefix(root).unwrap_or(&full);
    let path = relative_display(rel);
    let file = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());

    Some(SearchHit {
        file,
        path,
        is_directory: false,
        match_type: MatchType::Content,
        line: data.line_number,
        text: data.lines.text.map(|t| t.trim().to_string()),
    })
}
