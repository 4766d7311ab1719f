//! In-progress install bookkeeping.
//!
//! The consumer side keeps one `InstallState` per `SnapshotId` it has
//! seen a chunk for. Modeled as a tagged variant rather than a
//! nullable/sentinel record (per the Design Notes' resolution of the
//! original's ambiguous "no active install" state): an id is either
//! `InProgress` with a real context, or `Invalid` because some earlier
//! chunk for it failed - there is no third, in-between representation
//! to accidentally operate on.

use std::time::Instant;

use crate::transient::TransientSnapshot;

/// Bookkeeping for one snapshot install in progress on the receiving
/// side.
pub struct ReplicationContext {
    /// Staging handle accumulating chunks.
    pub transient: TransientSnapshot,
    /// Declared chunk count from the first chunk seen for this id.
    pub total_count: u32,
    /// Chunks successfully written so far.
    pub chunks_received: u32,
    /// When the first chunk for this id arrived, for the install
    /// duration histogram.
    pub started_at: Instant,
}

impl ReplicationContext {
    pub fn new(transient: TransientSnapshot, total_count: u32, started_at: Instant) -> Self {
        Self {
            transient,
            total_count,
            chunks_received: 0,
            started_at,
        }
    }

    /// True once every declared chunk has been written.
    pub fn is_complete(&self) -> bool {
        self.chunks_received >= self.total_count
    }
}

/// The state held per `SnapshotId` that the consumer side has started
/// (or refused) to install.
pub enum InstallState {
    /// Chunks are still arriving (or all have arrived and a commit is
    /// about to be attempted).
    InProgress(ReplicationContext),
    /// A previous chunk for this id was rejected; every subsequent
    /// chunk for the same id is dropped without inspection until the
    /// producer starts a fresh install under a new id.
    Invalid,
}
