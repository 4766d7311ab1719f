//! Committed snapshot type and the store that manages promotion, retention,
//! and listener notification.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::chunk::{checksum_of_content, combined_checksum};
use crate::observability::Logger;

use super::errors::{StoreError, StoreResult};
use super::id::SnapshotId;

/// An immutable, committed snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    id: SnapshotId,
    path: PathBuf,
    checksum: u64,
}

impl Snapshot {
    /// Identity of this snapshot.
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Directory this snapshot lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Combined checksum of the snapshot's files in sorted order.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// The Raft log index this snapshot covers (the compaction bound).
    pub fn compaction_bound(&self) -> u64 {
        self.id.index()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotManifest {
    index: u64,
    term: u64,
    processed_position: u64,
    checksum: u64,
}

const MANIFEST_FILE: &str = "manifest.json";

fn manifest_path(snapshot_dir: &Path) -> PathBuf {
    snapshot_dir.join(MANIFEST_FILE)
}

fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Files directly under `dir`, sorted by name, excluding the manifest
/// file itself. Sorting is what makes `combined_checksum` deterministic.
fn sorted_content_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_name().map(|n| n != MANIFEST_FILE).unwrap_or(false))
        .collect();
    entries.sort();
    Ok(entries)
}

fn compute_dir_checksum(dir: &Path) -> io::Result<u64> {
    let files = sorted_content_files(dir)?;
    let mut checksums = Vec::with_capacity(files.len());
    for file in files {
        let bytes = fs::read(&file)?;
        checksums.push(checksum_of_content(&bytes));
    }
    Ok(combined_checksum(checksums))
}

struct StoreInner {
    snapshots_dir: PathBuf,
    pending_dir: PathBuf,
    retention_enabled: bool,
    listeners: RefCell<Vec<Box<dyn Fn(&Snapshot)>>>,
}

/// Manages committed and staging snapshot directories for one partition.
///
/// Cheap to clone: internally reference-counted so a `TransientSnapshot`
/// can hold a handle back to the store that issued it without the store
/// needing `Arc`/locking (single-threaded per-partition model, see
/// SPEC_FULL.md §5).
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Rc<StoreInner>,
}

impl SnapshotStore {
    /// Open (creating if necessary) the snapshot store rooted at
    /// `partition_root/{snapshots,pending}`, with the default "keep
    /// latest only" retention policy enabled. Sweeps every entry under
    /// `pending/` before returning, per the "staging is swept on
    /// startup" rule.
    pub fn open(partition_root: &Path) -> StoreResult<Self> {
        Self::open_with_retention(partition_root, true)
    }

    /// Open the store as `open` does, but with retention enabled or
    /// disabled per `retention_enabled`. Disabling it is useful for an
    /// operator inspecting several generations of committed snapshot on
    /// disk; every committed snapshot is then kept until removed
    /// manually.
    pub fn open_with_retention(partition_root: &Path, retention_enabled: bool) -> StoreResult<Self> {
        let snapshots_dir = partition_root.join("snapshots");
        let pending_dir = partition_root.join("pending");

        fs::create_dir_all(&snapshots_dir)
            .map_err(|e| StoreError::io_failure("creating snapshots dir", e))?;
        fs::create_dir_all(&pending_dir)
            .map_err(|e| StoreError::io_failure("creating pending dir", e))?;

        crate::crash_point::maybe_crash(crate::crash_point::points::STARTUP_BEFORE_PENDING_SWEEP);
        Self::sweep_pending(&pending_dir)?;

        Ok(Self {
            inner: Rc::new(StoreInner {
                snapshots_dir,
                pending_dir,
                retention_enabled,
                listeners: RefCell::new(Vec::new()),
            }),
        })
    }

    fn sweep_pending(pending_dir: &Path) -> StoreResult<()> {
        let entries = fs::read_dir(pending_dir)
            .map_err(|e| StoreError::io_failure("reading pending dir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_failure("reading pending entry", e))?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)
                    .map_err(|e| StoreError::io_failure("sweeping stale staging dir", e))?;
                Logger::info("SNAPSHOT_STALE_STAGING_SWEPT", &[
                    ("path", &path.display().to_string()),
                ]);
            }
        }
        Ok(())
    }

    /// Directory a given snapshot id would live in once committed.
    pub fn snapshot_directory_for(&self, id: SnapshotId) -> PathBuf {
        self.inner.snapshots_dir.join(id.to_dir_name())
    }

    /// Directory a transient snapshot with the given id stages into.
    pub fn pending_directory_for(&self, id: SnapshotId) -> PathBuf {
        self.inner.pending_dir.join(id.to_dir_name())
    }

    /// Whether a committed snapshot with this id exists on disk.
    pub fn exists(&self, id: SnapshotId) -> bool {
        manifest_path(&self.snapshot_directory_for(id)).is_file()
    }

    /// Combined checksum of a staging directory's content files, in
    /// sorted order. Exposed so callers building a `TransientSnapshot`
    /// from a database checkpoint (rather than from received chunks)
    /// can record the expected checksum immediately after staging.
    pub fn compute_staging_checksum(&self, staging_dir: &Path) -> StoreResult<u64> {
        compute_dir_checksum(staging_dir).map_err(|e| StoreError::io_failure("computing staging checksum", e))
    }

    /// The most recently committed snapshot, if any.
    pub fn latest_snapshot(&self) -> StoreResult<Option<Snapshot>> {
        let entries = fs::read_dir(&self.inner.snapshots_dir)
            .map_err(|e| StoreError::io_failure("reading snapshots dir", e))?;

        let mut latest: Option<SnapshotId> = None;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_failure("reading snapshot entry", e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(id) = SnapshotId::from_dir_name(name) else {
                continue;
            };
            if !manifest_path(&path).is_file() {
                // Incomplete/corrupt directory with no manifest: ignore it,
                // it is not a valid committed snapshot.
                continue;
            }
            latest = Some(match latest {
                Some(current) if current >= id => current,
                _ => id,
            });
        }

        match latest {
            None => Ok(None),
            Some(id) => self.read_snapshot(id).map(Some),
        }
    }

    fn read_snapshot(&self, id: SnapshotId) -> StoreResult<Snapshot> {
        let dir = self.snapshot_directory_for(id);
        let manifest_bytes = fs::read(manifest_path(&dir))
            .map_err(|e| StoreError::io_failure("reading manifest", e))?;
        let manifest: SnapshotManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| StoreError::unrecoverable_state(format!("corrupt manifest: {e}")))?;
        Ok(Snapshot {
            id,
            path: dir,
            checksum: manifest.checksum,
        })
    }

    /// Register a listener invoked synchronously, in registration order,
    /// after every successful `commit_snapshot`.
    pub fn add_snapshot_listener(&self, listener: Box<dyn Fn(&Snapshot)>) {
        self.inner.listeners.borrow_mut().push(listener);
    }

    /// Promote a staged directory to a committed snapshot.
    ///
    /// Verifies the staged files' combined checksum against
    /// `expected_checksum` before promoting - this is the whole-snapshot
    /// checksum verification the original implementation left
    /// unimplemented (see DESIGN.md "Open Question resolutions"). A
    /// mismatch removes the staging directory and fails the commit; it
    /// never silently promotes unverified data.
    ///
    /// Already-committed ids are treated as already satisfied: the
    /// staging directory is discarded and the existing snapshot is
    /// returned, matching the `AlreadyCommitted` error-kind's
    /// no-op-success handling in SPEC_FULL.md §7.
    pub fn commit_snapshot(
        &self,
        id: SnapshotId,
        staging_dir: &Path,
        expected_checksum: u64,
    ) -> StoreResult<Snapshot> {
        if self.exists(id) {
            let _ = fs::remove_dir_all(staging_dir);
            return self.read_snapshot(id);
        }

        let actual_checksum = compute_dir_checksum(staging_dir)
            .map_err(|e| StoreError::io_failure("computing staged checksum", e))?;
        if actual_checksum != expected_checksum {
            let _ = fs::remove_dir_all(staging_dir);
            return Err(StoreError::commit_checksum_mismatch(format!(
                "snapshot {id}: expected checksum {expected_checksum:#x}, computed {actual_checksum:#x}"
            )));
        }

        let manifest = SnapshotManifest {
            index: id.index(),
            term: id.term(),
            processed_position: id.processed_position(),
            checksum: actual_checksum,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StoreError::io_failure("serializing manifest", io::Error::new(io::ErrorKind::Other, e)))?;
        fs::write(manifest_path(staging_dir), manifest_bytes)
            .map_err(|e| StoreError::io_failure("writing manifest", e))?;
        File::open(manifest_path(staging_dir))
            .and_then(|f| f.sync_all())
            .map_err(|e| StoreError::io_failure("fsyncing manifest", e))?;

        let dest = self.snapshot_directory_for(id);
        crate::crash_point::maybe_crash(crate::crash_point::points::SNAPSHOT_COMMIT_BEFORE_RENAME);
        fs::rename(staging_dir, &dest).map_err(|e| StoreError::io_failure("promoting staging dir", e))?;
        crate::crash_point::maybe_crash(crate::crash_point::points::SNAPSHOT_COMMIT_AFTER_RENAME);
        fsync_dir(&self.inner.snapshots_dir)
            .map_err(|e| StoreError::io_failure("fsyncing snapshots dir", e))?;

        let snapshot = Snapshot {
            id,
            path: dest,
            checksum: actual_checksum,
        };

        Logger::info("SNAPSHOT_COMMITTED", &[
            ("index", &id.index().to_string()),
            ("term", &id.term().to_string()),
            ("checksum", &format!("{:#x}", actual_checksum)),
        ]);

        if self.inner.retention_enabled {
            crate::crash_point::maybe_crash(crate::crash_point::points::SNAPSHOT_COMMIT_BEFORE_RETENTION);
            self.apply_retention(id)?;
        }

        for listener in self.inner.listeners.borrow().iter() {
            listener(&snapshot);
        }

        Ok(snapshot)
    }

    /// Default retention policy: keep only the snapshot just committed,
    /// best-effort deleting older ones. Failures are logged, not
    /// propagated - retention is cleanup, not correctness.
    fn apply_retention(&self, keep: SnapshotId) -> StoreResult<()> {
        let entries = fs::read_dir(&self.inner.snapshots_dir)
            .map_err(|e| StoreError::io_failure("reading snapshots dir for retention", e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(id) = SnapshotId::from_dir_name(name) else {
                continue;
            };
            if id != keep {
                if let Err(e) = fs::remove_dir_all(&path) {
                    Logger::warn("SNAPSHOT_RETENTION_CLEANUP_FAILED", &[
                        ("path", &path.display().to_string()),
                        ("error", &e.to_string()),
                    ]);
                }
            }
        }
        Ok(())
    }
}
