//! Error taxonomy for the state controller.

use std::fmt;
use std::io;

/// Severity of a state-controller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable: the requested operation failed, the partition stays up.
    Error,
    /// Unrecoverable: the database handle cannot be trusted.
    Fatal,
}

/// Stable error codes for state-controller failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorCode {
    /// Opening or installing the database failed.
    DatabaseOpenFailed,
    /// A checkpoint could not be taken.
    CheckpointFailed,
    /// An operation was attempted while the database was closed.
    DatabaseClosed,
    /// The snapshot store reported an unrecoverable condition.
    UnrecoverableState,
}

impl StateErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StateErrorCode::DatabaseOpenFailed => "STATE_DATABASE_OPEN_FAILED",
            StateErrorCode::CheckpointFailed => "STATE_CHECKPOINT_FAILED",
            StateErrorCode::DatabaseClosed => "STATE_DATABASE_CLOSED",
            StateErrorCode::UnrecoverableState => "STATE_UNRECOVERABLE_STATE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StateErrorCode::UnrecoverableState => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// An error raised by the state controller.
#[derive(Debug)]
pub struct StateError {
    code: StateErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl StateError {
    fn new(code: StateErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn database_open_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StateErrorCode::DatabaseOpenFailed,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn checkpoint_failed(message: impl Into<String>) -> Self {
        Self::new(StateErrorCode::CheckpointFailed, message)
    }

    pub fn database_closed(message: impl Into<String>) -> Self {
        Self::new(StateErrorCode::DatabaseClosed, message)
    }

    pub fn unrecoverable_state(message: impl Into<String>) -> Self {
        Self::new(StateErrorCode::UnrecoverableState, message)
    }

    pub fn code(&self) -> StateErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<crate::store::StoreError> for StateError {
    fn from(err: crate::store::StoreError) -> Self {
        if err.is_fatal() {
            StateError::unrecoverable_state(err.to_string())
        } else {
            StateError::checkpoint_failed(err.to_string())
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;
