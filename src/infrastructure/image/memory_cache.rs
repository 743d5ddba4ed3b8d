//! In-memory LRU bitmap cache bounded by decoded byte size.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::Bitmap;
use crate::domain::ports::ImageCachePort;

/// Default byte bound: 10 MiB of decoded pixels.
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

struct CacheEntry {
    bitmap: Arc<Bitmap>,
    size: usize,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    total_bytes: usize,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.total_bytes -= entry.size;
        Some(entry)
    }
}

/// LRU cache for decoded bitmaps.
///
/// The cost of an entry is its raw pixel buffer size
/// ([`Bitmap::byte_count`]). After every `put` the least recently used
/// entries are dropped until the total cost fits within `max_bytes`.
pub struct BitmapLruCache {
    state: Mutex<CacheState>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BitmapLruCache {
    /// Creates a cache holding at most `max_bytes` of decoded pixels.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a cache with the default byte bound.
    #[must_use]
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }

    /// Returns the configured byte bound.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns the bytes currently retained.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }

    /// Looks up a bitmap without promoting it in the LRU order.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Arc<Bitmap>> {
        self.state
            .lock()
            .entries
            .peek(key)
            .map(|entry| entry.bitmap.clone())
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let state = self.state.lock();
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            size: state.entries.len(),
            bytes: state.total_bytes,
            max_bytes: self.max_bytes,
        }
    }
}

impl Default for BitmapLruCache {
    fn default() -> Self {
        Self::with_default_size()
    }
}

impl std::fmt::Debug for BitmapLruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapLruCache")
            .field("max_bytes", &self.max_bytes)
            .field("total_bytes", &self.total_bytes())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries dropped to stay within the bound.
    pub evictions: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached bitmaps.
    pub size: usize,
    /// Bytes currently retained.
    pub bytes: usize,
    /// Configured byte bound.
    pub max_bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} bitmaps, {}/{} bytes, {:.1}% hit rate ({} hits, {} misses, {} evictions)",
            self.size,
            self.bytes,
            self.max_bytes,
            self.hit_rate,
            self.hits,
            self.misses,
            self.evictions
        )
    }
}

impl ImageCachePort for BitmapLruCache {
    fn get(&self, key: &str) -> Option<Arc<Bitmap>> {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = key, "Bitmap cache hit");
            Some(entry.bitmap.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = key, "Bitmap cache miss");
            None
        }
    }

    fn put(&self, key: &str, bitmap: Arc<Bitmap>) {
        let size = bitmap.byte_count();
        let mut state = self.state.lock();

        state.remove(key);
        state.entries.put(key.to_string(), CacheEntry { bitmap, size });
        state.total_bytes += size;
        trace!(key = key, size = size, total = state.total_bytes, "Stored bitmap");

        while state.total_bytes > self.max_bytes {
            let Some((evicted, entry)) = state.entries.pop_lru() else {
                break;
            };
            state.total_bytes -= entry.size;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %evicted, size = entry.size, "Evicted bitmap from cache");
        }
    }

    fn remove(&self, key: &str) -> Option<Arc<Bitmap>> {
        let removed = self.state.lock().remove(key)?;
        debug!(key = key, "Removed bitmap from cache");
        Some(removed.bitmap)
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_bytes = 0;
        debug!("Cleared bitmap cache");
    }
}
