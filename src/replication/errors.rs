//! Error taxonomy for the replication controller.
//!
//! Mirrors the `XxxError`/`XxxErrorCode` shape used by `chunk`, `store`,
//! and `transient`, but at the controller's level of abstraction: a
//! caller driving `ReplicationController` should not need to match on
//! the underlying subsystem's error type to know whether a failure is
//! fatal.

use std::fmt;

/// Severity of a replication error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable: the install attempt failed, the controller stays up.
    Error,
    /// Unrecoverable: the partition's on-disk state cannot be trusted.
    Fatal,
}

/// Stable error codes for replication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationErrorCode {
    /// A chunk failed its own content checksum.
    ChunkCorrupt,
    /// A chunk named a file already present in staging.
    DuplicateChunk,
    /// Filesystem or transport I/O failed.
    IoFailure,
    /// The assembled snapshot's combined checksum did not match.
    CommitChecksumMismatch,
    /// The snapshot id was already committed.
    AlreadyCommitted,
    /// The in-memory install record for a snapshot id is unusable.
    UnrecoverableState,
}

impl ReplicationErrorCode {
    /// Stable string form, e.g. for log fields or CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            ReplicationErrorCode::ChunkCorrupt => "REPL_CHUNK_CORRUPT",
            ReplicationErrorCode::DuplicateChunk => "REPL_DUPLICATE_CHUNK",
            ReplicationErrorCode::IoFailure => "REPL_IO_FAILURE",
            ReplicationErrorCode::CommitChecksumMismatch => "REPL_COMMIT_CHECKSUM_MISMATCH",
            ReplicationErrorCode::AlreadyCommitted => "REPL_ALREADY_COMMITTED",
            ReplicationErrorCode::UnrecoverableState => "REPL_UNRECOVERABLE_STATE",
        }
    }

    /// Default severity for this code.
    pub fn severity(&self) -> Severity {
        match self {
            ReplicationErrorCode::UnrecoverableState => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// An error raised by the replication controller.
#[derive(Debug)]
pub struct ReplicationError {
    code: ReplicationErrorCode,
    message: String,
}

impl ReplicationError {
    fn new(code: ReplicationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn chunk_corrupt(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::ChunkCorrupt, message)
    }

    pub fn duplicate_chunk(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::DuplicateChunk, message)
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::IoFailure, message)
    }

    pub fn commit_checksum_mismatch(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::CommitChecksumMismatch, message)
    }

    pub fn already_committed(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::AlreadyCommitted, message)
    }

    pub fn unrecoverable_state(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorCode::UnrecoverableState, message)
    }

    pub fn code(&self) -> ReplicationErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ReplicationError {}

/// Map a `store::StoreError` onto the controller's error taxonomy.
impl From<crate::store::StoreError> for ReplicationError {
    fn from(err: crate::store::StoreError) -> Self {
        use crate::store::StoreErrorCode::*;
        let message = err.to_string();
        match err.code() {
            CommitChecksumMismatch => ReplicationError::commit_checksum_mismatch(message),
            AlreadyCommitted => ReplicationError::already_committed(message),
            UnrecoverableState => ReplicationError::unrecoverable_state(message),
            IoFailure | NotFound => ReplicationError::io_failure(message),
        }
    }
}

pub type ReplicationResult<T> = Result<T, ReplicationError>;
