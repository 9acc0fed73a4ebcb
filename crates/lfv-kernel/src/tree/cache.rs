//! Bounded memo tables with LRU eviction.
//!
//! Values are stored behind `Arc` so a hit is a refcount bump, not a deep
//! clone of a directory tree. The lock is never held across an await.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

struct CacheEntry<V> {
    value: Arc<V>,
    /// Last access time for LRU eviction.
    last_access: Instant,
}

/// A size-bounded cache table.
pub struct BoundedCache<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    max_entries: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Create a cache holding at most `max_entries` values (minimum 1).
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a value, refreshing its LRU position.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(key)?;
        entry.last_access = Instant::now();
        Some(Arc::clone(&entry.value))
    }

    /// Store a value, evicting the least recently used entries if needed.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.write();
        if !entries.contains_key(&key) {
            self.evict_if_needed(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                last_access: Instant::now(),
            },
        );
        value
    }

    /// Drop a single entry. Returns true if something was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry whose key matches `pred`. Returns how many were removed.
    pub fn invalidate_where(&self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|k, _| !pred(k));
        before - entries.len()
    }

    /// Drop everything.
    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    /// Whether a key is currently cached (does not touch LRU order).
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Evict oldest entries until there is room for one more.
    fn evict_if_needed(&self, entries: &mut HashMap<K, CacheEntry<V>>) {
        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());

            match oldest {
                Some(key) => {
                    tracing::trace!(cache = self.name, key = ?key, "evicting");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
