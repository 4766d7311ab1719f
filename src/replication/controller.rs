//! Replication controller: producer (fan-out) and consumer (assembly)
//! sides of snapshot replication.
//!
//! Single-threaded per partition - there is exactly one controller per
//! Raft partition, driven from that partition's own event loop, so
//! `received_snapshots` is a plain `HashMap` behind no lock.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::chunk::SnapshotChunk;
use crate::observability::{Logger, MetricsRegistry};
use crate::reader::ChunkReader;
use crate::store::{Snapshot, SnapshotId, SnapshotStore};
use crate::transient::TransientSnapshot;

use super::context::{InstallState, ReplicationContext};
use super::errors::{ReplicationError, ReplicationResult};
use super::transport::SnapshotTransport;

/// Drives both directions of snapshot replication for one partition.
pub struct ReplicationController {
    store: SnapshotStore,
    transport: Box<dyn SnapshotTransport>,
    metrics: Rc<MetricsRegistry>,
    received_snapshots: HashMap<SnapshotId, InstallState>,
}

impl ReplicationController {
    pub fn new(store: SnapshotStore, transport: Box<dyn SnapshotTransport>, metrics: Rc<MetricsRegistry>) -> Self {
        Self {
            store,
            transport,
            metrics,
            received_snapshots: HashMap::new(),
        }
    }

    /// Producer side: a new snapshot has just been committed locally.
    /// Publish every chunk in order; stop at the first transport
    /// failure rather than retrying, leaving the peer to resume (or the
    /// next snapshot to supersede this one).
    pub fn on_new_snapshot(&self, snapshot: &Snapshot) -> ReplicationResult<()> {
        let mut reader = ChunkReader::open(snapshot).map_err(ReplicationError::from)?;
        while let Some(chunk) = reader.next().map_err(ReplicationError::from)? {
            self.transport.publish(&chunk)?;
            self.metrics.increment_chunks_sent();
        }
        reader.close();
        self.metrics.increment_snapshots_produced();
        Ok(())
    }

    /// Consumer side: one chunk has arrived from a peer.
    ///
    /// Returns the freshly committed `Snapshot` once the install
    /// completes, or `None` while more chunks are still expected.
    pub fn on_chunk(&mut self, chunk: SnapshotChunk) -> ReplicationResult<Option<Snapshot>> {
        let id: SnapshotId = chunk
            .snapshot_id
            .parse()
            .map_err(|_| ReplicationError::chunk_corrupt(format!("unparseable snapshot id {:?}", chunk.snapshot_id)))?;

        if matches!(self.received_snapshots.get(&id), Some(InstallState::Invalid)) {
            Logger::warn("CHUNK_DROPPED_INVALID_INSTALL", &[
                ("snapshot_id", &id.to_string()),
                ("chunk_name", &chunk.chunk_name),
            ]);
            return Ok(None);
        }

        if !self.received_snapshots.contains_key(&id) {
            let transient = TransientSnapshot::for_install(&self.store, id).map_err(ReplicationError::from)?;
            self.metrics.install_started();
            self.received_snapshots.insert(
                id,
                InstallState::InProgress(ReplicationContext::new(transient, chunk.total_count, Instant::now())),
            );
        }

        let context = match self.received_snapshots.get_mut(&id) {
            Some(InstallState::InProgress(context)) => context,
            _ => unreachable!("just inserted or confirmed InProgress above"),
        };

        let accepted = match context.transient.write(&chunk) {
            Ok(accepted) => accepted,
            Err(e) => {
                self.invalidate(id);
                return Err(ReplicationError::from(e));
            }
        };

        if !accepted {
            self.metrics.increment_chunks_rejected();
            self.invalidate(id);
            return Ok(None);
        }

        context.chunks_received += 1;
        self.metrics.increment_chunks_received();

        if !context.is_complete() {
            return Ok(None);
        }

        let started_at = context.started_at;
        let InstallState::InProgress(context) = self
            .received_snapshots
            .remove(&id)
            .expect("id was just confirmed present")
        else {
            unreachable!()
        };

        let result = context.transient.commit();
        self.metrics.install_ended(Some(started_at.elapsed()));

        match result {
            Ok(snapshot) => {
                self.metrics.increment_snapshots_committed();
                Logger::info("SNAPSHOT_INSTALL_COMPLETE", &[("snapshot_id", &id.to_string())]);
                self.clear_stale_invalid_entries(id);
                Ok(Some(snapshot))
            }
            Err(e) => {
                if e.is_checksum_mismatch() {
                    self.metrics.increment_commit_checksum_mismatches();
                }
                Err(ReplicationError::io_failure(e.to_string()))
            }
        }
    }

    fn invalidate(&mut self, id: SnapshotId) {
        if let Some(InstallState::InProgress(mut context)) = self.received_snapshots.remove(&id) {
            context.transient.abort();
            self.metrics.install_ended(None);
        }
        self.received_snapshots.insert(id, InstallState::Invalid);
    }

    /// Drop every `Invalid` sentinel older than a snapshot id that just
    /// committed successfully. Per SPEC_FULL.md §4.E, a poisoned id is
    /// only ever reclaimed by a strictly newer commit, never on a
    /// timer; in-progress installs for older ids are left untouched
    /// since retention only removes committed directories, not staging
    /// ones (see `scenario_interleaved_snapshots_progress_independently`).
    fn clear_stale_invalid_entries(&mut self, committed_id: SnapshotId) {
        self.received_snapshots
            .retain(|id, state| !(*id < committed_id && matches!(state, InstallState::Invalid)));
    }

    /// Number of installs currently tracked (in progress or invalidated).
    pub fn tracked_install_count(&self) -> usize {
        self.received_snapshots.len()
    }
}
