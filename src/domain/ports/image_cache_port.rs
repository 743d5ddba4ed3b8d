//! Port definition for bitmap caching.

use std::sync::Arc;

use crate::domain::entities::Bitmap;

/// In-memory store of decoded bitmaps keyed by URL.
///
/// Implementations must be thread-safe and evict synchronously within `put`.
pub trait ImageCachePort: Send + Sync {
    /// Returns the cached bitmap and marks it most recently used.
    fn get(&self, key: &str) -> Option<Arc<Bitmap>>;

    /// Stores a bitmap, evicting older entries if needed.
    fn put(&self, key: &str, bitmap: Arc<Bitmap>);

    /// Removes a bitmap from the cache.
    fn remove(&self, key: &str) -> Option<Arc<Bitmap>>;

    /// Returns the current number of cached bitmaps.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all bitmaps from the cache.
    fn clear(&self);
}
