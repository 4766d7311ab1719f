//! Write-side staging handle for a snapshot under construction.
//!
//! State machine: `Open -> Written -> Committed | Aborted`. `Open` is
//! the state before any content has been written (only reachable on the
//! receiving side, via `TransientSnapshot::for_install`); `Written`
//! means at least one chunk (or a whole checkpoint) is staged and the
//! handle is eligible to commit.

mod errors;

pub use errors::{Severity, TransientError, TransientErrorCode, TransientResult};

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::chunk::SnapshotChunk;
use crate::collaborators::KvDatabase;
use crate::observability::Logger;
use crate::store::{Snapshot, SnapshotId, SnapshotStore, StoreResult};

/// Lifecycle state of a `TransientSnapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientState {
    /// Staging directory exists but nothing has been written yet.
    Open,
    /// At least one chunk (or a full checkpoint) has been staged.
    Written,
    /// Promoted to a committed snapshot.
    Committed,
    /// Discarded; the staging directory no longer exists.
    Aborted,
}

/// A snapshot being assembled in `pending/`, either by a local database
/// checkpoint or by chunks arriving from a peer.
pub struct TransientSnapshot {
    store: SnapshotStore,
    id: SnapshotId,
    staging_dir: PathBuf,
    state: TransientState,
    expected_checksum: Option<u64>,
}

impl TransientSnapshot {
    /// Construction path for the producer side: take a fresh checkpoint
    /// of `db` directly into the staging directory, then record its
    /// checksum immediately. Already `Written`, since the whole
    /// checkpoint is present as soon as this call returns.
    pub fn from_checkpoint(store: &SnapshotStore, id: SnapshotId, db: &dyn KvDatabase) -> StoreResult<Self> {
        let staging_dir = store.pending_directory_for(id);
        fs::create_dir_all(&staging_dir)
            .map_err(|e| crate::store::StoreError::io_failure("creating staging dir", e))?;

        db.create_checkpoint(&staging_dir)
            .map_err(|e| crate::store::StoreError::io_failure("creating checkpoint", e))?;
        fsync_dir_recursive(&staging_dir)
            .map_err(|e| crate::store::StoreError::io_failure("fsyncing staged checkpoint", e))?;

        let expected_checksum = store.compute_staging_checksum(&staging_dir)?;

        Ok(Self {
            store: store.clone(),
            id,
            staging_dir,
            state: TransientState::Written,
            expected_checksum: Some(expected_checksum),
        })
    }

    /// Construction path for the consumer side: a fresh, empty staging
    /// directory ready to receive chunks one at a time.
    pub fn for_install(store: &SnapshotStore, id: SnapshotId) -> StoreResult<Self> {
        let staging_dir = store.pending_directory_for(id);
        fs::create_dir_all(&staging_dir)
            .map_err(|e| crate::store::StoreError::io_failure("creating staging dir", e))?;

        Ok(Self {
            store: store.clone(),
            id,
            staging_dir,
            state: TransientState::Open,
            expected_checksum: None,
        })
    }

    /// Identity of the snapshot under construction.
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransientState {
        self.state
    }

    /// Write one received chunk to the staging directory.
    ///
    /// Returns:
    /// - `Ok(true)` if the snapshot is already committed (the chunk is
    ///   redundant but harmless - the install is already satisfied).
    /// - `Ok(false)` if the chunk's content checksum is wrong, its
    ///   `snapshot_checksum` disagrees with a previously recorded one,
    ///   or a file by that name already exists in staging (duplicate
    ///   chunk).
    /// - `Ok(true)` after a successful exclusive-create write.
    pub fn write(&mut self, chunk: &SnapshotChunk) -> StoreResult<bool> {
        if self.store.exists(self.id) {
            self.state = TransientState::Written;
            return Ok(true);
        }

        if !matches!(self.state, TransientState::Open | TransientState::Written) {
            return Ok(false);
        }

        if !chunk.checksum_is_valid() {
            Logger::warn("CHUNK_CORRUPT", &[
                ("snapshot_id", &self.id.to_string()),
                ("chunk_name", &chunk.chunk_name),
            ]);
            return Ok(false);
        }

        if let Some(expected) = self.expected_checksum {
            if expected != chunk.snapshot_checksum {
                Logger::warn("CHUNK_SNAPSHOT_CHECKSUM_DISAGREEMENT", &[
                    ("snapshot_id", &self.id.to_string()),
                    ("chunk_name", &chunk.chunk_name),
                ]);
                return Ok(false);
            }
        } else {
            self.expected_checksum = Some(chunk.snapshot_checksum);
        }

        let path = self.staging_dir.join(&chunk.chunk_name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(_) => {
                Logger::warn("CHUNK_DUPLICATE", &[
                    ("snapshot_id", &self.id.to_string()),
                    ("chunk_name", &chunk.chunk_name),
                ]);
                return Ok(false);
            }
        };
        file.write_all(&chunk.content)
            .map_err(|e| crate::store::StoreError::io_failure("writing chunk", e))?;
        crate::crash_point::maybe_crash(crate::crash_point::points::CHUNK_WRITE_BEFORE_FSYNC);
        file.sync_all()
            .map_err(|e| crate::store::StoreError::io_failure("fsyncing chunk", e))?;
        crate::crash_point::maybe_crash(crate::crash_point::points::CHUNK_WRITE_AFTER_FSYNC);

        self.state = TransientState::Written;
        Ok(true)
    }

    /// Promote this staging directory to a committed snapshot.
    pub fn commit(mut self) -> Result<Snapshot, TransientError> {
        match self.state {
            TransientState::Committed | TransientState::Aborted => {
                return Err(TransientError::already_finalized(format!(
                    "snapshot {} is already {:?}",
                    self.id, self.state
                )));
            }
            TransientState::Open => {
                return Err(TransientError::no_data_written(format!(
                    "snapshot {} has no staged content to commit",
                    self.id
                )));
            }
            TransientState::Written => {}
        }

        let expected_checksum = self
            .expected_checksum
            .expect("Written state implies expected_checksum is set");

        let snapshot = self
            .store
            .commit_snapshot(self.id, &self.staging_dir, expected_checksum)
            .map_err(|e| TransientError::commit_failed(e.code(), e.to_string()))?;
        self.state = TransientState::Committed;
        Ok(snapshot)
    }

    /// Discard the staging directory. Best-effort, idempotent.
    pub fn abort(&mut self) {
        if matches!(self.state, TransientState::Committed | TransientState::Aborted) {
            return;
        }
        let _ = fs::remove_dir_all(&self.staging_dir);
        self.state = TransientState::Aborted;
    }
}

fn fsync_dir_recursive(dir: &PathBuf) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            fsync_dir_recursive(&path)?;
        } else {
            File::open(&path)?.sync_all()?;
        }
    }
    File::open(dir)?.sync_all()
}
