//! Drawing cache: payload cache with a write-time expiry window
//!
//! Entries are keyed by image id and age out a fixed window after the
//! instant they were written; there is no sliding expiration and no
//! background eviction timer. Expiry is checked lazily on `get` (which
//! evicts what it finds expired) and eagerly via `clear_expired`, whose
//! scheduling is left to the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use sketchanim::PathData;
use sketchstore::SketchStore;

use crate::error::{Error, Result};
use crate::stats::CacheCounters;

/// Default expiry window (24 hours)
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached drawing payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Image id the entry is keyed by
    pub image: String,
    /// The drawing payload
    pub data: PathData,
    /// Instant of write, Unix ms
    pub timestamp: i64,
}

/// Entry-count snapshot. Read-only: unlike `get`, taking a snapshot
/// never evicts anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries in the store
    pub total_entries: usize,
    /// Entries past the expiry window but not yet evicted
    pub expired_entries: usize,
    /// `total_entries - expired_entries`
    pub valid_entries: usize,
}

/// Cached drawing payloads over a durable [`SketchStore`].
///
/// The store is opened lazily on first use; a cache value can be
/// constructed without touching the filesystem.
pub struct DrawingCache {
    dir: PathBuf,
    expiry_ms: i64,
    store: RwLock<Option<SketchStore>>,
    counters: CacheCounters,
}

impl DrawingCache {
    /// Cache over the given directory with the given expiry window
    pub fn new<P: AsRef<Path>>(dir: P, expiry: Duration) -> Self {
        DrawingCache {
            dir: dir.as_ref().to_path_buf(),
            expiry_ms: i64::try_from(expiry.as_millis()).unwrap_or(i64::MAX),
            store: RwLock::new(None),
            counters: CacheCounters::new(),
        }
    }

    /// Cache with the default 24 hour window
    pub fn with_default_expiry<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir, DEFAULT_EXPIRY)
    }

    /// Get the entry for an image if present and not expired.
    ///
    /// An expired entry is deleted as a side effect and reported as
    /// absent. Cache failures should not be treated as fatal by
    /// callers: the cache is an optimization, not a source of truth.
    pub fn get(&self, image: &str) -> Result<Option<CacheEntry>> {
        let record = self.with_store(|store| Ok(store.get(image)?))?;

        let record = match record {
            Some(record) => record,
            None => {
                self.counters.record_miss();
                return Ok(None);
            }
        };

        let age = now_ms() - record.timestamp;
        if age > self.expiry_ms {
            self.with_store(|store| Ok(store.delete(image)?))?;
            self.counters.record_expiry();
            self.counters.record_miss();
            return Ok(None);
        }

        let data: PathData = serde_json::from_slice(&record.value)?;
        self.counters.record_hit();

        Ok(Some(CacheEntry {
            image: image.to_string(),
            data,
            timestamp: record.timestamp,
        }))
    }

    /// Upsert the payload for an image, stamped with the current time.
    ///
    /// The payload's shape/colour alignment is a caller contract and is
    /// not validated here.
    pub fn set(&self, image: &str, data: &PathData) -> Result<()> {
        let value = serde_json::to_vec(data)?;
        let timestamp = now_ms();
        self.with_store(|store| Ok(store.put(image, timestamp, &value)?))?;
        self.counters.record_insert();
        Ok(())
    }

    /// Delete the entry for an image; absent entries are a no-op
    pub fn delete(&self, image: &str) -> Result<bool> {
        self.with_store(|store| Ok(store.delete(image)?))
    }

    /// Evict every entry past the expiry window; returns the evicted
    /// count. Safe to run concurrently with `get`/`set`; an entry
    /// written mid-scan may or may not be considered.
    pub fn clear_expired(&self) -> Result<usize> {
        let cutoff = now_ms() - self.expiry_ms;
        self.with_store(|store| {
            let keys = store.keys_older_than(cutoff)?;
            let mut evicted = 0;
            for key in keys {
                if store.delete(&key)? {
                    self.counters.record_expiry();
                    evicted += 1;
                }
            }
            Ok(evicted)
        })
    }

    /// Entry-count snapshot; never mutates the store
    pub fn stats(&self) -> Result<CacheStats> {
        let cutoff = now_ms() - self.expiry_ms;
        self.with_store(|store| {
            let stamps = store.timestamps()?;
            let total_entries = stamps.len();
            let expired_entries = stamps.iter().filter(|(_, ts)| *ts < cutoff).count();
            Ok(CacheStats {
                total_entries,
                expired_entries,
                valid_entries: total_entries - expired_entries,
            })
        })
    }

    /// Unconditionally empty the store and reset the counters
    pub fn clear(&self) -> Result<()> {
        self.with_store(|store| Ok(store.clear()?))?;
        self.counters.reset();
        Ok(())
    }

    /// Access counters for this cache instance
    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    fn ensure_open(&self) -> Result<()> {
        if self.store.read().is_some() {
            return Ok(());
        }
        let mut guard = self.store.write();
        if guard.is_none() {
            *guard = Some(SketchStore::open(&self.dir).map_err(Error::Unavailable)?);
        }
        Ok(())
    }

    fn with_store<T>(&self, f: impl FnOnce(&SketchStore) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let guard = self.store.read();
        match guard.as_ref() {
            Some(store) => f(store),
            None => Err(Error::Unavailable(sketchstore::Error::Closed)),
        }
    }

    #[cfg(test)]
    fn set_at(&self, image: &str, data: &PathData, timestamp: i64) -> Result<()> {
        let value = serde_json::to_vec(data)?;
        self.with_store(|store| Ok(store.put(image, timestamp, &value)?))
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchanim::{Point, Rgb};
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn payload() -> PathData {
        PathData {
            coordinates: vec![vec![
                Point { x: 0.0, y: 0.0 },
                Point { x: 10.0, y: 0.0 },
                Point { x: 10.0, y: 10.0 },
            ]],
            colours: vec![Rgb {
                r: 0.2,
                g: 0.4,
                b: 0.6,
            }],
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let before = now_ms();
        cache.set("cat.png", &payload()).unwrap();
        let after = now_ms();

        let entry = cache.get("cat.png").unwrap().unwrap();
        assert_eq!(entry.image, "cat.png");
        assert_eq!(entry.data, payload());
        assert!(entry.timestamp >= before && entry.timestamp <= after);

        assert_eq!(cache.counters().hits(), 1);
        assert_eq!(cache.counters().inserts(), 1);
    }

    #[test]
    fn test_get_absent_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        assert!(cache.get("missing.png").unwrap().is_none());
        assert_eq!(cache.counters().misses(), 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let stale = now_ms() - HOUR.as_millis() as i64 - 60_000;
        cache.set_at("cat.png", &payload(), stale).unwrap();

        assert!(cache.get("cat.png").unwrap().is_none());
        assert_eq!(cache.counters().expirations(), 1);
        assert_eq!(cache.counters().misses(), 1);

        // The eviction was durable, not just a filtered read
        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_fresh_entry_survives_get() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let recent = now_ms() - HOUR.as_millis() as i64 + 60_000;
        cache.set_at("cat.png", &payload(), recent).unwrap();

        assert!(cache.get("cat.png").unwrap().is_some());
    }

    #[test]
    fn test_overwrite_refreshes_timestamp() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let stale = now_ms() - HOUR.as_millis() as i64 - 60_000;
        cache.set_at("cat.png", &payload(), stale).unwrap();
        cache.set("cat.png", &payload()).unwrap();

        assert!(cache.get("cat.png").unwrap().is_some());
        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 0);
    }

    #[test]
    fn test_stats_snapshot_counts_without_evicting() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let stale = now_ms() - HOUR.as_millis() as i64 - 60_000;
        cache.set_at("old.png", &payload(), stale).unwrap();
        cache.set("new.png", &payload()).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.valid_entries, 1);

        // A second snapshot sees the same state
        assert_eq!(cache.stats().unwrap(), stats);
    }

    #[test]
    fn test_clear_expired() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        let stale = now_ms() - HOUR.as_millis() as i64 - 60_000;
        cache.set_at("old-1.png", &payload(), stale).unwrap();
        cache.set_at("old-2.png", &payload(), stale - 1000).unwrap();
        cache.set("new.png", &payload()).unwrap();

        let evicted = cache.clear_expired().unwrap();
        assert_eq!(evicted, 2);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(cache.counters().expirations(), 2);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        assert!(!cache.delete("missing.png").unwrap());

        cache.set("cat.png", &payload()).unwrap();
        assert!(cache.delete("cat.png").unwrap());
        assert!(cache.get("cat.png").unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::new(dir.path(), HOUR);

        cache.set("cat.png", &payload()).unwrap();
        cache.set("dog.png", &payload()).unwrap();
        cache.clear().unwrap();

        assert_eq!(cache.stats().unwrap().total_entries, 0);
        assert_eq!(cache.counters().inserts(), 0);
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();

        {
            let cache = DrawingCache::new(dir.path(), HOUR);
            cache.set("cat.png", &payload()).unwrap();
        }

        let cache = DrawingCache::new(dir.path(), HOUR);
        let entry = cache.get("cat.png").unwrap().unwrap();
        assert_eq!(entry.data, payload());
    }

    #[test]
    fn test_unusable_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-directory");
        std::fs::write(&blocker, b"plain file").unwrap();

        let cache = DrawingCache::new(&blocker, HOUR);
        let result = cache.get("cat.png");
        assert!(matches!(result, Err(Error::Unavailable(_))));
    }
}
