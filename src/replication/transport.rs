//! Collaborator seam for delivering chunks to a peer.
//!
//! The controller does not know whether chunks travel over Raft's
//! existing RPC channel, a side TCP connection, or an in-process queue
//! in tests - it only needs `publish`.

use crate::chunk::SnapshotChunk;

use super::errors::ReplicationResult;

/// Delivers one encoded chunk to the peer(s) installing a snapshot.
pub trait SnapshotTransport {
    /// Send `chunk` onward. An error here does not corrupt local state;
    /// the controller simply stops replicating this snapshot and lets
    /// the next one supersede it.
    fn publish(&self, chunk: &SnapshotChunk) -> ReplicationResult<()>;
}
