//! Configuration types for the SeriesIO node agent
//!
//! These structures mirror the on-disk TOML layout. Every field has a
//! serde default so a partial (or absent) config file still yields a
//! working configuration; the binary merges CLI flags over these values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the node agent
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node configuration
    #[serde(default)]
    pub node: NodeConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node identity and listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listen address for the HTTP API
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding the metric database tree
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Writable directory for transient upload staging
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            staging_dir: default_staging_dir(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "seriesio_store=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:4242".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("/var/lib/seriesio/metrics")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/var/lib/seriesio/staging")
}

fn default_log_level() -> String {
    "info".to_string()
}
