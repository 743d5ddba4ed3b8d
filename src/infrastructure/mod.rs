//! Infrastructure layer with the transport, queue and cache adapters.

/// Application configuration.
pub mod config;
/// Process-wide client objects.
pub mod context;
/// HTTP transport.
pub mod http;
/// Bitmap caching and image loading.
pub mod image;
/// Prioritized request queue.
pub mod queue;

pub use config::{AppConfig, CliArgs, ConfigError, DemoCommand, LogLevel, StorageManager};
pub use context::ClientContext;
pub use http::ReqwestTransport;
pub use image::{BitmapLruCache, CacheStats, ImageLoader};
pub use queue::{RequestHandle, RequestQueue, RequestQueueConfig};
