//! Chunk codec error types.

use std::fmt;

/// Severity levels for chunk errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A single chunk is unusable; the transfer can retry or fail independently.
    Warn,
    /// The chunk cannot be interpreted at all.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Chunk codec error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkErrorCode {
    /// The byte stream ended before a declared field could be read in full.
    Truncated,
    /// A declared length field claims more bytes than remain in the input.
    LengthOverflow,
    /// A string field was not valid UTF-8.
    InvalidUtf8,
    /// The content checksum did not match `checksum_of_content`.
    ChecksumMismatch,
}

impl ChunkErrorCode {
    /// Stable string code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ChunkErrorCode::Truncated => "CHUNK_TRUNCATED",
            ChunkErrorCode::LengthOverflow => "CHUNK_LENGTH_OVERFLOW",
            ChunkErrorCode::InvalidUtf8 => "CHUNK_INVALID_UTF8",
            ChunkErrorCode::ChecksumMismatch => "CHUNK_CHECKSUM_MISMATCH",
        }
    }

    /// Severity for this error kind.
    pub fn severity(&self) -> Severity {
        match self {
            ChunkErrorCode::ChecksumMismatch => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ChunkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A decode or checksum failure in the chunk codec.
#[derive(Debug, Clone)]
pub struct ChunkError {
    code: ChunkErrorCode,
    message: String,
}

impl ChunkError {
    fn new(code: ChunkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The input ended before a declared field was fully read.
    pub fn truncated(message: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::Truncated, message)
    }

    /// A declared length exceeds the remaining input.
    pub fn length_overflow(message: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::LengthOverflow, message)
    }

    /// A string field failed UTF-8 validation.
    pub fn invalid_utf8(message: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::InvalidUtf8, message)
    }

    /// Content checksum did not match the declared checksum.
    pub fn checksum_mismatch(message: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::ChecksumMismatch, message)
    }

    /// Stable error code.
    pub fn code(&self) -> ChunkErrorCode {
        self.code
    }

    /// Severity for this error.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Chunk errors are never fatal to the partition; the caller marks the
    /// in-flight install invalid and moves on.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)
    }
}

impl std::error::Error for ChunkError {}

/// Result type for chunk codec operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_is_warn_not_error() {
        let err = ChunkError::checksum_mismatch("bad checksum");
        assert_eq!(err.severity(), Severity::Warn);
    }

    #[test]
    fn decode_errors_are_not_fatal() {
        assert!(!ChunkError::truncated("eof").is_fatal());
        assert!(!ChunkError::length_overflow("too long").is_fatal());
        assert!(!ChunkError::invalid_utf8("bad utf8").is_fatal());
    }

    #[test]
    fn display_contains_code_and_message() {
        let err = ChunkError::truncated("expected 4 more bytes");
        let text = format!("{}", err);
        assert!(text.contains("CHUNK_TRUNCATED"));
        assert!(text.contains("expected 4 more bytes"));
    }
}
