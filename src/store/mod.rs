//! Snapshot store: committed/staging directory layout, atomic promotion,
//! retention, and commit listeners.

mod errors;
mod id;
mod snapshot;

pub use errors::{StoreError, StoreErrorCode, StoreResult, Severity};
pub use id::SnapshotId;
pub use snapshot::{Snapshot, SnapshotStore};
