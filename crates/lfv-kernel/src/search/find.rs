//! Filename search through `find`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::error::SearchResult;
use super::process::collect_lines;
use super::strategy::SearchStrategy;
use super::{MatchType, SearchHit};

pub struct FindStrategy {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl FindStrategy {
    pub fn new() -> Self {
        Self::with_command("find", Vec::<OsString>::new())
    }

    /// Run `program` with `leading_args` placed before the usual find
    /// arguments.
    pub fn with_command(
        program: impl Into<PathBuf>,
        leading_args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for FindStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchStrategy for FindStrategy {
    fn name(&self) -> &str {
        "find"
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
            .args(&self.leading_args)
            .arg(root)
            .arg("-iname")
            .arg(format!("*{}*", escape_glob(query)))
            .arg("-type")
            .arg("f")
            .arg("-printf")
            .arg("%P\\n");

        collect_lines(self.name(), command, timeout, cancel, parse_line).await
    }
}

/// `%P` prints the path relative to the starting point.
fn parse_line(line: &str) -> Option<SearchHit> {
    let path = line.trim_end_matches('\r');
    if path.is_empty() {
        return None;
    }
    let file = path.rsplit('/').next().unwrap_or(path).to_string();
    Some(SearchHit {
        file,
        path: path.to_string(),
        is_directory: false,
        match_type: MatchType::Filename,
        line: None,
        text: None,
    })
}

/// Make glob metacharacters in the query match literally.
fn escape_glob(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::error::SearchError;
    use tempfile::TempDir;

    #[test]
    fn test_parse_line() {
        let hit = parse_line("notes/2024/report.md").unwrap();
        assert_eq!(hit.file, "report.md");
        assert_eq!(hit.path, "notes/2024/report.md");
        assert_eq!(hit.match_type, MatchType::Filename);
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
        assert_eq!(escape_glob("plain"), "plain");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_matches() {
        // sh -c takes the find arguments as positional parameters and ignores them
        let fake = FindStrategy::with_command(
            "sh",
            ["-c", "printf 'a.txt\\nsub/b.txt\\nc.txt\\n'; exit 1", "find"],
        );
        let hits = fake
            .execute("txt", Path::new("/"), Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[1].path, "sub/b.txt");
        assert_eq!(hits[1].file, "b.txt");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let find = FindStrategy::with_command("lfv-missing-find", Vec::<OsString>::new());
        assert!(!find.probe().await);
        let err = find
            .execute("x", Path::new("/"), Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ToolUnavailable { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_real_find() {
        let find = FindStrategy::new();
        if !find.probe().await {
            return;
        }
        let dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        std::fs::create_dir(root.join("Reports")).unwrap();
        std::fs::write(root.join("Reports/Q1-REPORT.md"), "").unwrap();
        std::fs::write(root.join("other.txt"), "").unwrap();

        let hits = find
            .execute("report", &root, Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        // directories are excluded by -type f
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "Reports/Q1-REPORT.md");
    }
}
