//! Change watching for files that have been read.
//!
//! One non-recursive `notify` watch per distinct path. Events invalidate the
//! stale cache entries through the `on_change` hook, bump a shared revision
//! counter and are broadcast to subscribers (the server turns these into
//! server-sent events so the browser re-fetches).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the change broadcast channel; slow subscribers see `Lagged`.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Kind of file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change notification for a watched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Value of the revision counter after this change.
    pub revision: u64,
}

type ChangeHook = Box<dyn Fn(&Path) + Send + Sync>;

struct WatchShared {
    watched: DashMap<PathBuf, ()>,
    revision: AtomicU64,
    events: broadcast::Sender<FileChange>,
    on_change: ChangeHook,
}

impl WatchShared {
    /// Runs on the notify thread. Must not touch the watcher itself.
    fn handle(&self, event: Event) {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            _ => return,
        };

        for path in event.paths {
            // revision moves before caches are touched; readers re-check it
            // after inserting
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            (self.on_change)(&path);

            // the inode is gone, so the watch is too; the next read re-registers
            if kind == ChangeKind::Removed {
                self.watched.remove(&path);
            }

            tracing::debug!(path = %path.display(), ?kind, revision, "file changed");

            // no subscribers is fine
            let _ = self.events.send(FileChange {
                path,
                kind,
                revision,
            });
        }
    }
}

/// Observes individual file paths for modification.
pub struct ChangeWatcher {
    watcher: Mutex<Option<RecommendedWatcher>>,
    shared: Arc<WatchShared>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("watched", &self.shared.watched.len())
            .field("revision", &self.revision())
            .finish()
    }
}

impl ChangeWatcher {
    /// Create a watcher that calls `on_change` for every changed path.
    ///
    /// If the platform watcher cannot be created, the returned watcher is
    /// inert: registrations are recorded but no events arrive.
    pub fn new(on_change: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let shared = Arc::new(WatchShared {
            watched: DashMap::new(),
            revision: AtomicU64::new(0),
            events,
            on_change: Box::new(on_change),
        });

        let handler = Arc::clone(&shared);
        let watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => handler.handle(event),
                Err(e) => tracing::warn!(error = %e, "file watcher error"),
            },
            notify::Config::default(),
        );

        let watcher = match watcher {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "file watching unavailable, content cache will not refresh");
                None
            }
        };

        Self {
            watcher: Mutex::new(watcher),
            shared,
        }
    }

    /// Start watching `path`. Returns true only for a new registration.
    pub fn watch(&self, path: &Path) -> bool {
        // insert first and drop the shard lock before talking to notify:
        // the notify thread may be inside `handle` touching the same map
        if self.shared.watched.insert(path.to_path_buf(), ()).is_some() {
            return false;
        }

        let mut guard = self.watcher.lock();
        let Some(watcher) = guard.as_mut() else {
            return false;
        };

        match watcher.watch(path, RecursiveMode::NonRecursive) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "watching file");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to watch file");
                drop(guard);
                self.shared.watched.remove(path);
                false
            }
        }
    }

    /// Whether `path` currently has a registered watch.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.shared.watched.contains_key(path)
    }

    /// Number of registered paths.
    pub fn watched_count(&self) -> usize {
        self.shared.watched.len()
    }

    /// Monotonic change counter; bumps once per changed path.
    pub fn revision(&self) -> u64 {
        self.shared.revision.load(Ordering::SeqCst)
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.shared.events.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, event: Event) {
        self.shared.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    fn counting_watcher() -> (ChangeWatcher, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let watcher = ChangeWatcher::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (watcher, hits)
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "a").unwrap();

        let (watcher, _) = counting_watcher();
        let first = watcher.watch(&file);
        assert!(!watcher.watch(&file));
        if first {
            assert!(watcher.is_watching(&file));
            assert_eq!(watcher.watched_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_events_bump_revision_and_broadcast() {
        let (watcher, hits) = counting_watcher();
        let mut rx = watcher.subscribe();
        let path = PathBuf::from("/srv/a.txt");

        watcher.inject(
            Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(path.clone()),
        );
        watcher.inject(Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone()));

        assert_eq!(watcher.revision(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let change = rx.recv().await.unwrap();
        assert_eq!(change.path, path);
        assert_eq!(change.kind, ChangeKind::Modified);
        assert_eq!(change.revision, 1);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Created);
    }

    #[test]
    fn test_access_events_are_ignored() {
        let (watcher, hits) = counting_watcher();
        watcher.inject(
            Event::new(EventKind::Access(notify::event::AccessKind::Any))
                .add_path(PathBuf::from("/srv/a.txt")),
        );
        assert_eq!(watcher.revision(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_drops_registration() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("gone.txt");
        std::fs::write(&file, "x").unwrap();

        let (watcher, _) = counting_watcher();
        watcher.watch(&file);
        watcher.inject(Event::new(EventKind::Remove(RemoveKind::File)).add_path(file.clone()));
        assert!(!watcher.is_watching(&file));
    }

    #[tokio::test]
    async fn test_real_modification_is_observed() {
        let dir = TempDir::new().unwrap();
        let file = dunce::canonicalize(dir.path()).unwrap().join("live.txt");
        std::fs::write(&file, "one").unwrap();

        let (watcher, _) = counting_watcher();
        if !watcher.watch(&file) {
            // no platform watcher in this environment
            return;
        }
        let mut rx = watcher.subscribe();

        std::fs::write(&file, "two").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change event within 5s")
            .unwrap();
        assert_eq!(change.path, file);
        assert!(watcher.revision() >= 1);
    }
}
