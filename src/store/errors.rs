//! Snapshot store error types.

use std::fmt;
use std::io;

/// Severity levels for store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, partition continues.
    Error,
    /// Partition state is no longer trustworthy; operator intervention required.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Snapshot store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Filesystem operation failed.
    IoFailure,
    /// The staged snapshot's combined checksum did not match the
    /// expected value computed while it was being written.
    CommitChecksumMismatch,
    /// A commit was attempted for a `SnapshotId` that is already
    /// committed on disk.
    AlreadyCommitted,
    /// A requested snapshot or staging directory does not exist.
    NotFound,
    /// On-disk state is inconsistent in a way recovery cannot resolve
    /// automatically (e.g. a committed directory that fails its own
    /// integrity check).
    UnrecoverableState,
}

impl StoreErrorCode {
    /// Stable string code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::IoFailure => "STORE_IO_FAILURE",
            StoreErrorCode::CommitChecksumMismatch => "STORE_COMMIT_CHECKSUM_MISMATCH",
            StoreErrorCode::AlreadyCommitted => "STORE_ALREADY_COMMITTED",
            StoreErrorCode::NotFound => "STORE_NOT_FOUND",
            StoreErrorCode::UnrecoverableState => "STORE_UNRECOVERABLE_STATE",
        }
    }

    /// Severity for this error kind.
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::UnrecoverableState => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned by snapshot store operations.
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// A filesystem operation failed.
    pub fn io_failure(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StoreErrorCode::IoFailure,
            message: message.into(),
            source: Some(source),
        }
    }

    /// The staged snapshot's combined checksum did not match.
    pub fn commit_checksum_mismatch(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::CommitChecksumMismatch, message)
    }

    /// The snapshot id is already committed.
    pub fn already_committed(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::AlreadyCommitted, message)
    }

    /// No such snapshot or staging directory.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, message)
    }

    /// On-disk state cannot be reconciled automatically.
    pub fn unrecoverable_state(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::UnrecoverableState, message)
    }

    /// Stable error code.
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Severity for this error.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Whether this error requires halting the partition.
    pub fn is_fatal(&self) -> bool {
        matches!(self.code.severity(), Severity::Fatal)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for snapshot store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecoverable_state_is_fatal() {
        let err = StoreError::unrecoverable_state("committed snapshot failed integrity check");
        assert!(err.is_fatal());
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn other_errors_are_not_fatal() {
        assert!(!StoreError::already_committed("x").is_fatal());
        assert!(!StoreError::commit_checksum_mismatch("x").is_fatal());
        assert!(!StoreError::not_found("x").is_fatal());
    }

    #[test]
    fn display_contains_code() {
        let text = format!("{}", StoreError::not_found("missing snapshot 1-1-1"));
        assert!(text.contains("STORE_NOT_FOUND"));
        assert!(text.contains("missing snapshot 1-1-1"));
    }
}
