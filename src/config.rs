//! Snapshot replication configuration.
//!
//! Configured externally (file, env, CLI), immutable once the
//! partition has started - the same discipline the old replication
//! config followed for node role.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable error codes for configuration problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// The config file could not be read.
    IoFailure,
    /// The config file's contents did not parse.
    Malformed,
    /// A field combination fails validation.
    Invalid,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::IoFailure => "CONFIG_IO_FAILURE",
            ConfigErrorCode::Malformed => "CONFIG_MALFORMED",
            ConfigErrorCode::Invalid => "CONFIG_INVALID",
        }
    }
}

/// Error returned by configuration loading/validation.
#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::IoFailure, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::Malformed, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::Invalid, message)
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Per-partition configuration for the snapshot replication subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Root directory this partition's `snapshots/` and `pending/`
    /// directories live under.
    pub partition_root: PathBuf,

    /// Whether the "keep latest only" retention sweep runs after each
    /// commit. Disabling it is useful for an operator who wants to
    /// inspect several generations of snapshot on disk.
    #[serde(default = "default_retention_enabled")]
    pub retention_enabled: bool,

    /// Maximum chunk content size, in bytes, the producer side will
    /// split a snapshot into.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: u64,
}

fn default_retention_enabled() -> bool {
    true
}

fn default_max_chunk_bytes() -> u64 {
    4 * 1024 * 1024
}

impl SnapshotConfig {
    /// Construct a configuration with retention on and the default
    /// chunk size.
    pub fn new(partition_root: impl Into<PathBuf>) -> Self {
        Self {
            partition_root: partition_root.into(),
            retention_enabled: default_retention_enabled(),
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let bytes = fs::read(path).map_err(|e| ConfigError::io_failure(format!("reading {}: {e}", path.display())))?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::malformed(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field combinations.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_chunk_bytes == 0 {
            return Err(ConfigError::invalid("max_chunk_bytes must be greater than zero"));
        }
        Ok(())
    }
}
