//! One-level directory autocomplete for the "change folder" prompt.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};

use crate::tree::natural_cmp;
use crate::vfs::Sandbox;

/// Candidate directories for a partially typed path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCompletion {
    /// Absolute paths of matching directories, `../` first when the query
    /// walks upward.
    pub files: Vec<String>,
    /// The user's home directory, so the client can abbreviate it as `~`.
    pub homedir: String,
}

/// List the sub-directories of the directory part of `query`.
///
/// Never fails: inputs outside the root, missing paths and files all yield an
/// empty list.
pub async fn complete_directory(sandbox: &Sandbox, query: &str) -> DirCompletion {
    let homedir = dirs::home_dir()
        .map(|h| h.display().to_string())
        .unwrap_or_default();
    let expanded = shellexpand::tilde(query).into_owned();

    let mut completion = DirCompletion {
        files: Vec::new(),
        homedir,
    };

    let dir_part = directory_part(&expanded, &completion.homedir);
    let resolved = if dir_part.is_empty() {
        Ok(sandbox.base())
    } else {
        sandbox.resolve_within_root(dir_part, true)
    };
    let dir = match resolved {
        Ok(dir) => dir,
        Err(e) => {
            tracing::debug!(query, error = %e, "no completions");
            return completion;
        }
    };

    completion.files = list_directories(&dir).await;
    if query.starts_with("../") {
        completion.files.insert(0, "../".to_string());
    }
    completion
}

/// The part of the query naming the directory to list: the whole query when
/// it already ends in `/` (or is `/` or the home directory), everything up to
/// the last `/` otherwise, and nothing for a bare name.
fn directory_part<'a>(query: &'a str, homedir: &str) -> &'a str {
    if query == homedir || query == "/" || query.ends_with('/') {
        return query;
    }
    match query.rfind('/') {
        None => "",
        Some(0) => "/",
        Some(idx) => &query[..idx],
    }
}

async fn list_directories(dir: &Path) -> Vec<String> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot list directory");
            return Vec::new();
        }
    };

    let mut entries: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        entries.push(entry.path());
    }

    let mut dirs: Vec<String> = stream::iter(entries)
        .map(|path| async move {
            // follows symlinks; unreadable entries are dropped
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => Some(path.display().to_string()),
                _ => None,
            }
        })
        .buffer_unordered(32)
        .filter_map(|p| async move { p })
        .collect()
        .await;

    dirs.sort_by(|a, b| natural_cmp(a, b));
    dirs
}
