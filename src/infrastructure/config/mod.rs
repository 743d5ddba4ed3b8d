//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{AppConfig, ImageCacheConfig, LogLevel, QueueConfig};
pub use args::{CliArgs, DemoCommand};
pub use storage::{ConfigError, StorageManager};
