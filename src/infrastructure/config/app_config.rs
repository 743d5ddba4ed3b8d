//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use crate::infrastructure::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::infrastructure::image::DEFAULT_MAX_BYTES;
use crate::infrastructure::queue::{DEFAULT_MAX_WORKERS, RequestQueueConfig};

pub(super) const APP_NAME: &str = "volea";
pub(super) const APP_QUALIFIER: &str = "dev";
pub(super) const APP_ORGANIZATION: &str = "volea";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from TOML and overridden by CLI flags.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Request queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Bitmap cache settings.
    #[serde(default)]
    pub image_cache: ImageCacheConfig,
}

/// Request queue and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum concurrently executing requests.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Client-wide request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl QueueConfig {
    /// Returns the client-wide timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the dispatcher configuration.
    #[must_use]
    pub const fn queue_config(&self) -> RequestQueueConfig {
        RequestQueueConfig {
            max_workers: self.max_workers,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Bitmap cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    /// Maximum decoded bytes retained.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

const fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

const fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(max_workers) = args.max_workers {
            self.queue.max_workers = max_workers;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.queue.timeout_secs = timeout_secs;
        }
        if let Some(max_bytes) = args.cache_bytes {
            self.image_cache.max_bytes = max_bytes;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("volea.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [queue]
            max_workers = 8

            [image_cache]
            max_bytes = 4096
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.queue.max_workers, 8);
        assert_eq!(config.queue.timeout_secs, 30);
        assert_eq!(config.queue.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.image_cache.max_bytes, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.queue.max_workers, 4);
        assert_eq!(config.queue.timeout(), Duration::from_secs(30));
        assert_eq!(config.image_cache.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config: AppConfig = toml::from_str("[queue]\nmax_workers = 8").unwrap();
        let args = CliArgs::parse_from([
            "volea",
            "--max-workers",
            "2",
            "--log-level",
            "trace",
            "string",
            "http://example.com",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.queue.max_workers, 2);
        assert_eq!(config.queue.queue_config().max_workers, 2);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.queue.timeout_secs, 30);
    }
}
