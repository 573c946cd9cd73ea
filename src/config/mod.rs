//! Configuration management for the geofencing coordinator
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_NAMESPACE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Persistent cache storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Registration coordinator behavior
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,

    /// Key namespace inside the database
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/geofences.db"),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Per-provider-call timeout in seconds; unset waits indefinitely
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl LoggingConfig {
    /// Filter directive for `tracing_subscriber::EnvFilter`
    ///
    /// The configured level applies to this crate; dependencies log at warn.
    /// `verbose` forces debug regardless of the configured level.
    pub fn filter_directive(&self, verbose: bool) -> String {
        let level = if verbose {
            "debug".to_string()
        } else {
            self.level.trim().to_ascii_lowercase()
        };
        format!("geofencing={level},warn")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let sqlite_path = std::env::var("GEOFENCING_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.sqlite_path);

        let namespace =
            std::env::var("GEOFENCING_NAMESPACE").unwrap_or(defaults.storage.namespace);

        let provider_timeout_secs = match std::env::var("GEOFENCING_PROVIDER_TIMEOUT") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid GEOFENCING_PROVIDER_TIMEOUT: {v}"))?,
            ),
            _ => None,
        };

        let level =
            std::env::var("GEOFENCING_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format =
            std::env::var("GEOFENCING_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            storage: StorageConfig {
                sqlite_path,
                namespace,
            },
            coordinator: CoordinatorConfig {
                provider_timeout_secs,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.namespace.trim().is_empty() {
            anyhow::bail!("storage.namespace must not be empty");
        }

        if self.coordinator.provider_timeout_secs == Some(0) {
            anyhow::bail!("provider_timeout_secs must be greater than 0 when set");
        }

        if !matches!(
            self.logging.level.trim().to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            anyhow::bail!(
                "logging.level must be one of trace, debug, info, warn, error (got '{}')",
                self.logging.level
            );
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }
}
