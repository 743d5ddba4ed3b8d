//! Image caching and loading.

pub mod loader;
pub mod memory_cache;

pub use loader::{BitmapResult, ImageLoader, cache_key};
pub use memory_cache::{BitmapLruCache, CacheStats, DEFAULT_MAX_BYTES};
