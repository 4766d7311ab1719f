//! Tagged state for the embedded database handle.
//!
//! Replaces a nullable `Option<Box<dyn KvDatabase>>` plus a separate
//! "is it open" flag with one enum: a `Closed` controller simply has no
//! variant carrying a handle to call through, so a use-after-close bug
//! is a missing match arm, not a runtime null check.

use crate::collaborators::KvDatabase;

/// Lifecycle state of the embedded state-machine database.
pub enum DbState {
    /// No database handle is open.
    Closed,
    /// An open database handle, ready to checkpoint or serve reads.
    Open(Box<dyn KvDatabase>),
}

impl DbState {
    /// Whether a database handle is currently open.
    pub fn is_open(&self) -> bool {
        matches!(self, DbState::Open(_))
    }
}
