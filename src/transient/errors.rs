//! Transient snapshot error types.

use std::fmt;

use crate::store::StoreErrorCode;

/// Severity levels for transient snapshot errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller should abort or retry.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR")
    }
}

/// Transient snapshot error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientErrorCode {
    /// `commit` was called before any content was written.
    NoDataWritten,
    /// An operation was attempted after the transient snapshot was
    /// already committed or aborted.
    AlreadyFinalized,
    /// The store rejected the commit (checksum mismatch or an I/O
    /// failure promoting the staging directory).
    CommitFailed,
}

impl TransientErrorCode {
    /// Stable string code.
    pub fn code(&self) -> &'static str {
        match self {
            TransientErrorCode::NoDataWritten => "TRANSIENT_NO_DATA_WRITTEN",
            TransientErrorCode::AlreadyFinalized => "TRANSIENT_ALREADY_FINALIZED",
            TransientErrorCode::CommitFailed => "TRANSIENT_COMMIT_FAILED",
        }
    }
}

impl fmt::Display for TransientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned by transient snapshot lifecycle operations.
#[derive(Debug, Clone)]
pub struct TransientError {
    code: TransientErrorCode,
    message: String,
    store_code: Option<StoreErrorCode>,
}

impl TransientError {
    /// `commit` was called with nothing ever written.
    pub fn no_data_written(message: impl Into<String>) -> Self {
        Self {
            code: TransientErrorCode::NoDataWritten,
            message: message.into(),
            store_code: None,
        }
    }

    /// The transient snapshot is already committed or aborted.
    pub fn already_finalized(message: impl Into<String>) -> Self {
        Self {
            code: TransientErrorCode::AlreadyFinalized,
            message: message.into(),
            store_code: None,
        }
    }

    /// The store refused to promote the staging directory; `store_code`
    /// carries the underlying reason (checksum mismatch vs. I/O
    /// failure) so callers can distinguish them without string-matching
    /// the message.
    pub fn commit_failed(store_code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: TransientErrorCode::CommitFailed,
            message: message.into(),
            store_code: Some(store_code),
        }
    }

    /// Stable error code.
    pub fn code(&self) -> TransientErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this failure was specifically a whole-snapshot checksum
    /// mismatch at commit time, as opposed to an I/O failure or a
    /// lifecycle misuse.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self.store_code, Some(StoreErrorCode::CommitChecksumMismatch))
    }

    /// Never fatal to the partition: the controller marks the install
    /// invalid and moves on.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", Severity::Error, self.code, self.message)
    }
}

impl std::error::Error for TransientError {}

/// Result type for transient snapshot operations.
pub type TransientResult<T> = Result<T, TransientError>;
