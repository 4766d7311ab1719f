//! Snapshot replication: fans a committed snapshot out as chunks to
//! followers, and assembles chunks arriving from a leader back into a
//! committed snapshot.

mod context;
mod controller;
mod errors;
mod transport;

pub use context::{InstallState, ReplicationContext};
pub use controller::ReplicationController;
pub use errors::{ReplicationError, ReplicationErrorCode, ReplicationResult, Severity};
pub use transport::SnapshotTransport;
