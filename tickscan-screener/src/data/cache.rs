//! Snapshot cache for screener runs.
//!
//! Caches each symbol's latest two indicator snapshots, keyed by the bar
//! store's dataset version. Appending bars moves the version, so entries
//! for the old version are simply never hit again and get purged at the
//! start of the next run. Results are identical with or without the cache.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::indicators::LatestSnapshots;

/// Cache entry tied to a dataset version
#[derive(Debug, Clone)]
struct CacheEntry {
    version: String,
    snapshots: LatestSnapshots,
}

/// Version-keyed cache of per-symbol latest snapshots
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SnapshotCache {
    /// Create a new snapshot cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get cached snapshots for a symbol at the given dataset version
    pub fn get(&self, symbol: &str, version: &str) -> Option<LatestSnapshots> {
        let cache = self.entries.read().ok()?;
        cache.get(symbol).and_then(|entry| {
            if entry.version == version {
                Some(entry.snapshots.clone())
            } else {
                None
            }
        })
    }

    /// Cache snapshots for a symbol at the given dataset version
    pub fn put(&self, symbol: &str, version: &str, snapshots: LatestSnapshots) {
        if let Ok(mut cache) = self.entries.write() {
            cache.insert(
                symbol.to_string(),
                CacheEntry {
                    version: version.to_string(),
                    snapshots,
                },
            );
        }
    }

    /// Drop every entry not at the given dataset version
    pub fn purge_stale(&self, version: &str) {
        if let Ok(mut cache) = self.entries.write() {
            cache.retain(|_, entry| entry.version == version);
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Ok(mut cache) = self.entries.write() {
            cache.clear();
        }
    }

    /// Number of cached symbols
    pub fn len(&self) -> usize {
        self.entries.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
