//! Remembered node positions, keyed by node-set signature.
//!
//! The cache is a bounded LRU of `key -> {node id -> pinned position}` maps serialized as one
//! JSON document into a [`KeyValueStore`]. A missing or unreadable document is treated as an
//! empty cache.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::error::Result;

const KEY_SEPARATOR: char = '\u{1f}';

/// Durable string storage behind the position cache.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// A JSON object file of string values. Writes rewrite the whole file.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }

    /// Current file contents; an unreadable file is overwritten on the next write.
    fn read_for_update(&self) -> BTreeMap<String, String> {
        self.read_all().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "discarding unreadable store file");
            BTreeMap::new()
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_for_update();
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut values = self.read_for_update();
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinnedPosition {
    pub fx: f64,
    pub fy: f64,
}

pub type PositionMap = BTreeMap<String, PinnedPosition>;

/// Order-insensitive signature of a node set.
pub fn nodes_key<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_unstable();
    let mut key = String::with_capacity(ids.iter().map(|id| id.len() + 1).sum());
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(id);
    }
    key
}

pub struct LayoutPositionCache {
    store: Box<dyn KeyValueStore>,
    config: CacheConfig,
    /// Least recently used first
    entries: IndexMap<String, PositionMap>,
}

impl LayoutPositionCache {
    pub fn new(store: Box<dyn KeyValueStore>, config: CacheConfig) -> Self {
        let entries = Self::read_entries(store.as_ref(), &config.storage_key);
        debug!(entries = entries.len(), "position cache loaded");
        Self {
            store,
            config,
            entries,
        }
    }

    fn read_entries(store: &dyn KeyValueStore, storage_key: &str) -> IndexMap<String, PositionMap> {
        let raw = match store.get(storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return IndexMap::new(),
            Err(e) => {
                warn!(error = %e, "position cache storage unreadable, starting empty");
                return IndexMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "position cache is corrupt, starting empty");
            IndexMap::new()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the positions stored for `key` and marks it most recently used.
    pub fn load(&mut self, key: &str) -> Option<&PositionMap> {
        let Some(index) = self.entries.get_index_of(key) else {
            trace!("position cache miss");
            return None;
        };
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        trace!(nodes = self.entries[last].len(), "position cache hit");
        Some(&self.entries[last])
    }

    /// Replaces the positions for `key`, evicts past capacity and persists.
    pub fn save(&mut self, key: &str, positions: PositionMap) -> Result<()> {
        self.entries.shift_remove(key);
        self.entries.insert(key.to_string(), positions);
        while self.entries.len() > self.config.capacity.max(1) {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(key = %evicted.replace(KEY_SEPARATOR, ","), "evicting cached layout");
            }
        }
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.store.remove(&self.config.storage_key)
    }

    fn persist(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.entries)?;
        self.store.set(&self.config.storage_key, &raw)
    }
}

impl std::fmt::Debug for LayoutPositionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutPositionCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(id: &str, fx: f64) -> PositionMap {
        PositionMap::from([(id.to_string(), PinnedPosition { fx, fy: 0.0 })])
    }

    fn cache(capacity: usize) -> LayoutPositionCache {
        LayoutPositionCache::new(
            Box::new(MemoryStore::new()),
            CacheConfig {
                capacity,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_nodes_key_ignores_order() {
        assert_eq!(nodes_key(["b", "a", "c"]), nodes_key(["c", "b", "a"]));
        assert_ne!(nodes_key(["a", "b"]), nodes_key(["a", "b", "c"]));
        assert_ne!(nodes_key(["ab", "c"]), nodes_key(["a", "bc"]));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let mut cache = cache(2);
        cache.save("one", positions("a", 1.0)).unwrap();
        cache.save("two", positions("a", 2.0)).unwrap();
        assert!(cache.load("one").is_some());
        cache.save("three", positions("a", 3.0)).unwrap();
        assert!(cache.contains("one"));
        assert!(!cache.contains("two"));
        assert!(cache.contains("three"));
    }

    #[test]
    fn test_save_overwrites() {
        let mut cache = cache(4);
        cache.save("k", positions("a", 1.0)).unwrap();
        cache.save("k", positions("a", 5.0)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.load("k").unwrap()["a"].fx, 5.0);
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let mut store = MemoryStore::new();
        let config = CacheConfig::default();
        store.set(&config.storage_key, "{not json").unwrap();
        let mut cache = LayoutPositionCache::new(Box::new(store), config);
        assert!(cache.is_empty());
        cache.save("k", positions("a", 1.0)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
