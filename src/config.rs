//! Engine configuration
//!
//! Defaults are built in; a YAML document may override any subset of fields, and a
//! handful of `KESTREL__*` environment variables override the result.
//!
//! ```yaml
//! cache:
//!   ttl_secs: 30
//!   capacity: 256
//! persistence:
//!   buffer_size: 1048576
//! scan:
//!   mismatch_policy: abort
//! ```

use crate::scan::MismatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub persistence: PersistenceConfig,
    pub scan: ScanConfig,
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Defaults or `path`, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = env_parse("KESTREL__CACHE__TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
        if let Some(capacity) = env_parse("KESTREL__CACHE__CAPACITY") {
            self.cache.capacity = capacity;
        }
        if let Some(buffer) = env_parse("KESTREL__PERSISTENCE__BUFFER_SIZE") {
            self.persistence.buffer_size = buffer;
        }
        if let Ok(policy) = std::env::var("KESTREL__SCAN__MISMATCH_POLICY") {
            match policy.to_lowercase().as_str() {
                "skip" => self.scan.mismatch_policy = MismatchPolicy::Skip,
                "abort" => self.scan.mismatch_policy = MismatchPolicy::Abort,
                _ => {}
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache capacity must be at least 1".to_string()));
        }
        if self.persistence.buffer_size == 0 {
            return Err(ConfigError::Invalid("persistence buffer size must be non-zero".to_string()));
        }
        let separator = self.persistence.version_separator;
        if separator.is_alphanumeric() || std::path::is_separator(separator) {
            return Err(ConfigError::Invalid(format!(
                "'{}' cannot separate snapshot file name parts",
                separator
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Traversal executor cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle time after which an executor is dropped
    pub ttl_secs: u64,
    /// Maximum number of cached executors
    pub capacity: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Read and write buffer size in bytes
    pub buffer_size: usize,
    /// Joins the snapshot base name, stream name and format version in file names
    pub version_separator: char,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100 * 1024 * 1024,
            version_separator: '#',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mismatch_policy: MismatchPolicy,
    /// Snapshots with at least this many elements are filtered in parallel
    pub parallel_threshold: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mismatch_policy: MismatchPolicy::Skip,
            parallel_threshold: 10_000,
        }
    }
}
