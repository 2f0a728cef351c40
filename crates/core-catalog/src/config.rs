use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{self as catalog_err, Result};

/// Runtime configuration for the dispatcher and connector cache, loaded
/// from YAML. Every field has a default so an empty document is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub cache: CacheConfig,
    pub dispatch: DispatchConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Connector cache sizing and eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live connector instances.
    pub max_connectors: u64,
    /// Seconds of inactivity before a connector is evicted and closed.
    pub idle_eviction_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_connectors: 128,
            idle_eviction_secs: 15 * 60,
        }
    }
}

/// Per-operation dispatch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound for one backend enactment call, in milliseconds.
    pub backend_timeout_ms: u64,
    /// Attempts per metadata commit when the store reports itself
    /// transiently unavailable. Version conflicts are never retried.
    pub storage_retry_attempts: u32,
    /// Base delay between storage retries, in milliseconds. Grows linearly
    /// per attempt.
    pub storage_retry_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend_timeout_ms: 30_000,
            storage_retry_attempts: 3,
            storage_retry_backoff_ms: 50,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            catalog_err::InvalidConfigFileSnafu {
                reason: format!("failed to read config file: {e}"),
            }
            .build()
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            catalog_err::InvalidConfigFileSnafu {
                reason: format!("failed to parse config YAML: {e}"),
            }
            .build()
        })
    }

    #[must_use]
    pub fn idle_eviction(&self) -> Duration {
        Duration::from_secs(self.cache.idle_eviction_secs)
    }

    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch.backend_timeout_ms)
    }

    #[must_use]
    pub fn storage_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.dispatch.storage_retry_backoff_ms)
    }
}
