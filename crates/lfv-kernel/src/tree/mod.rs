//! Cached directory tree and memoized file access.
//!
//! [`DirectoryTree`] owns four independent [`BoundedCache`] tables (walks,
//! listings, contents, stats) and a [`ChangeWatcher`] that drops content and
//! stat entries when a file that was read changes on disk.
//!
//! All paths passed in are expected to be canonical absolute paths produced by
//! the sandbox resolver; they are used verbatim as cache keys.

mod cache;
mod walk;
mod watcher;

pub use cache::BoundedCache;
pub use walk::{IGNORED_NAMES, natural_cmp};
pub use watcher::{ChangeKind, ChangeWatcher, FileChange};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::TreeConfig;
use crate::vfs::{Encoding, FileAttr, FileData, VfsError, VfsResult, WalkDirItem};

/// Walk depth meaning "no limit".
pub const UNBOUNDED: usize = usize::MAX;

struct TreeCaches {
    walks: BoundedCache<(PathBuf, usize), WalkDirItem>,
    listings: BoundedCache<PathBuf, Vec<String>>,
    contents: BoundedCache<(PathBuf, Encoding), FileData>,
    stats: BoundedCache<PathBuf, FileAttr>,
}

impl TreeCaches {
    fn new(capacity: usize) -> Self {
        Self {
            walks: BoundedCache::new("walks", capacity),
            listings: BoundedCache::new("listings", capacity),
            contents: BoundedCache::new("contents", capacity),
            stats: BoundedCache::new("stats", capacity),
        }
    }

    /// Called from the watcher thread for a changed file.
    fn forget_file(&self, path: &Path) {
        let dropped = self.contents.invalidate_where(|(p, _)| p == path);
        self.stats.invalidate(&path.to_path_buf());
        tracing::trace!(path = %path.display(), dropped, "content cache invalidated");
    }
}

/// Directory snapshots plus memoized `stat`, `readdir` and `read_file`.
pub struct DirectoryTree {
    caches: Arc<TreeCaches>,
    watcher: ChangeWatcher,
    config: TreeConfig,
}

impl std::fmt::Debug for DirectoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTree")
            .field("walks", &self.caches.walks.len())
            .field("contents", &self.caches.contents.len())
            .field("watcher", &self.watcher)
            .finish()
    }
}

impl DirectoryTree {
    pub fn new(config: TreeConfig) -> Self {
        let caches = Arc::new(TreeCaches::new(config.cache_capacity));
        let on_change = Arc::clone(&caches);
        let watcher = ChangeWatcher::new(move |path| on_change.forget_file(path));
        Self {
            caches,
            watcher,
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Depth-bounded snapshot of `dir`. Root entries are level 1;
    /// subdirectories are expanded while their parent's level is at most
    /// `max_depth`.
    pub async fn walk(&self, dir: &Path, max_depth: usize) -> VfsResult<Arc<WalkDirItem>> {
        let key = (dir.to_path_buf(), max_depth);
        if let Some(hit) = self.caches.walks.get(&key) {
            tracing::trace!(dir = %dir.display(), max_depth, "walk cache hit");
            return Ok(hit);
        }

        let started = std::time::Instant::now();
        let tree = self.walk_uncached(dir, max_depth).await?;
        tracing::debug!(
            dir = %dir.display(),
            max_depth,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "walked directory"
        );
        Ok(self.caches.walks.insert(key, tree))
    }

    /// Metadata for `path`, following symlinks.
    pub async fn stat(&self, path: &Path) -> VfsResult<Arc<FileAttr>> {
        let key = path.to_path_buf();
        if let Some(hit) = self.caches.stats.get(&key) {
            return Ok(hit);
        }
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        Ok(self.caches.stats.insert(key, FileAttr::from_metadata(&meta)))
    }

    /// Entry names of `dir`, naturally sorted. Nothing is filtered.
    pub async fn readdir(&self, dir: &Path) -> VfsResult<Arc<Vec<String>>> {
        let key = dir.to_path_buf();
        if let Some(hit) = self.caches.listings.get(&key) {
            return Ok(hit);
        }

        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| VfsError::from_io(dir, e))?;
        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort_by(|a, b| natural_cmp(a, b));

        Ok(self.caches.listings.insert(key, names))
    }

    /// Contents of `path` decoded per `encoding`.
    ///
    /// The first read of a path registers a change watch; later changes drop
    /// the cached content so the next read goes back to disk.
    pub async fn read_file(&self, path: &Path, encoding: Encoding) -> VfsResult<Arc<FileData>> {
        let key = (path.to_path_buf(), encoding);
        if let Some(hit) = self.caches.contents.get(&key) {
            return Ok(hit);
        }

        // the cached stat may predate a write, so size the file afresh
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        let attr = self
            .caches
            .stats
            .insert(path.to_path_buf(), FileAttr::from_metadata(&meta));
        if attr.is_dir() {
            return Err(VfsError::invalid_path(format!(
                "{} is a directory",
                path.display()
            )));
        }
        if attr.size > self.config.max_file_size {
            return Err(VfsError::FileTooLarge {
                path: path.display().to_string(),
                size: attr.size,
                limit: self.config.max_file_size,
            });
        }

        let seen = self.watcher.revision();
        self.watcher.watch(path);

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        let data = FileData::decode(bytes, encoding);
        Ok(self.store_content(key, data, seen))
    }

    /// Cache `data` unless a change was observed since revision `seen`.
    fn store_content(&self, key: (PathBuf, Encoding), data: FileData, seen: u64) -> Arc<FileData> {
        let stored = self.caches.contents.insert(key.clone(), data);
        if self.watcher.revision() != seen {
            // may be stale; serve it once but do not keep it
            self.caches.contents.invalidate(&key);
            tracing::trace!(path = %key.0.display(), "change during read, not caching");
        }
        stored
    }

    /// Drop every cached entry for `path`: its stat, listing, contents in
    /// any encoding and walks rooted at it.
    pub fn invalidate(&self, path: &Path) {
        let owned = path.to_path_buf();
        self.caches.stats.invalidate(&owned);
        self.caches.listings.invalidate(&owned);
        self.caches.contents.invalidate_where(|(p, _)| p == path);
        self.caches.walks.invalidate_where(|(p, _)| p == path);
    }

    /// Clear all four tables.
    pub fn invalidate_all(&self) {
        self.caches.walks.invalidate_all();
        self.caches.listings.invalidate_all();
        self.caches.contents.invalidate_all();
        self.caches.stats.invalidate_all();
        tracing::debug!("all tree caches cleared");
    }

    /// Whether a walk of `dir` at `max_depth` is cached.
    pub fn is_walk_cached(&self, dir: &Path, max_depth: usize) -> bool {
        self.caches.walks.contains(&(dir.to_path_buf(), max_depth))
    }

    /// Whether content of `path` is cached in `encoding`.
    pub fn is_content_cached(&self, path: &Path, encoding: Encoding) -> bool {
        self.caches.contents.contains(&(path.to_path_buf(), encoding))
    }

    pub fn watcher(&self) -> &ChangeWatcher {
        &self.watcher
    }

    /// Subscribe to change notifications for files that have been read.
    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.watcher.subscribe()
    }
}
