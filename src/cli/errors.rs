//! CLI-specific error types.

use std::fmt;
use std::io;

/// CLI error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error.
    ConfigError,
    /// I/O error (stdout, filesystem).
    IoError,
    /// The requested snapshot id does not exist.
    SnapshotNotFound,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SNAPCTL_CONFIG_ERROR",
            Self::IoError => "SNAPCTL_IO_ERROR",
            Self::SnapshotNotFound => "SNAPCTL_SNAPSHOT_NOT_FOUND",
        }
    }
}

/// CLI error.
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn snapshot_not_found(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SnapshotNotFound, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<crate::config::ConfigError> for CliError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<crate::store::StoreError> for CliError {
    fn from(e: crate::store::StoreError) -> Self {
        Self::io_error(e.to_string())
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
