//! State controller: owns the embedded database handle, recovers it
//! from the latest snapshot on startup, and produces new snapshots
//! bound to the exporter's committed position.

mod db;
mod errors;

pub use db::DbState;
pub use errors::{Severity, StateError, StateErrorCode, StateResult};

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::collaborators::{ExporterPositionSupplier, KvDatabaseFactory};
use crate::observability::MetricsRegistry;
use crate::store::{SnapshotId, SnapshotStore};
use crate::transient::TransientSnapshot;

/// Owns the partition's embedded database and coordinates it with the
/// snapshot store: recovering it from the latest snapshot at startup,
/// and staging fresh snapshots bound to where compaction last left off.
pub struct StateController {
    db: DbState,
    store: SnapshotStore,
    factory: Box<dyn KvDatabaseFactory>,
    runtime_dir: PathBuf,
    last_compaction_bound: Rc<Cell<Option<u64>>>,
    metrics: Rc<MetricsRegistry>,
}

impl StateController {
    /// Construct a controller over a closed database. Call `recover`
    /// before using it.
    pub fn new(
        store: SnapshotStore,
        factory: Box<dyn KvDatabaseFactory>,
        runtime_dir: impl Into<PathBuf>,
        metrics: Rc<MetricsRegistry>,
    ) -> Self {
        Self {
            db: DbState::Closed,
            store,
            factory,
            runtime_dir: runtime_dir.into(),
            last_compaction_bound: Rc::new(Cell::new(None)),
            metrics,
        }
    }

    /// Whether the database is currently open.
    pub fn is_open(&self) -> bool {
        self.db.is_open()
    }

    /// The Raft log index the last snapshot (taken or installed) covers.
    pub fn compaction_bound(&self) -> Option<u64> {
        self.last_compaction_bound.get()
    }

    /// Open the database, installing it from the latest committed
    /// snapshot if one exists, otherwise opening it fresh. Registers a
    /// listener on the store so every subsequent commit (from either
    /// this partition taking its own snapshot, or a peer's snapshot
    /// being installed) updates the compaction bound.
    pub fn recover(&mut self) -> StateResult<()> {
        self.metrics.increment_recovery_runs();

        let latest = self.store.latest_snapshot().map_err(StateError::from)?;
        let install_from = latest.as_ref().map(|s| s.path());
        let db = match self.factory.open(&self.runtime_dir, install_from) {
            Ok(db) => db,
            Err(e) => {
                self.metrics.increment_recovery_failures();
                // Whatever the factory left behind is not trustworthy -
                // never start from a partially installed runtime directory.
                let _ = std::fs::remove_dir_all(&self.runtime_dir);
                return Err(if install_from.is_some() {
                    // A committed snapshot exists but could not be installed: the
                    // partition has no trustworthy state to fall back to.
                    StateError::unrecoverable_state(format!("opening database from committed snapshot: {e}"))
                } else {
                    StateError::database_open_failed("opening database", e)
                });
            }
        };

        self.last_compaction_bound.set(latest.map(|s| s.compaction_bound()));
        self.db = DbState::Open(db);

        let bound = Rc::clone(&self.last_compaction_bound);
        self.store.add_snapshot_listener(Box::new(move |snapshot| {
            bound.set(Some(snapshot.compaction_bound()));
        }));

        Ok(())
    }

    /// Close the database handle. Idempotent.
    pub fn close(&mut self) -> StateResult<()> {
        if let DbState::Open(db) = std::mem::replace(&mut self.db, DbState::Closed) {
            db.close().map_err(|e| StateError::database_open_failed("closing database", e))?;
        }
        Ok(())
    }

    /// Stage a new snapshot at `id`, provided `id`'s index is past the
    /// last compaction bound and does not run ahead of what the
    /// exporter has durably processed.
    ///
    /// Idempotent: a request at or behind the current bound returns
    /// `Ok(None)` rather than re-checkpointing, so a caller retriggering
    /// the same compaction decision twice is harmless.
    pub fn take_transient_snapshot(
        &self,
        id: SnapshotId,
        exporter: &dyn ExporterPositionSupplier,
    ) -> StateResult<Option<TransientSnapshot>> {
        if let Some(bound) = self.last_compaction_bound.get() {
            if id.index() <= bound {
                return Ok(None);
            }
        }
        if (id.processed_position() as i64) > exporter.exporter_position() {
            return Ok(None);
        }

        let db = match &self.db {
            DbState::Open(db) => db.as_ref(),
            DbState::Closed => return Err(StateError::database_closed("cannot checkpoint a closed database")),
        };

        let transient = TransientSnapshot::from_checkpoint(&self.store, id, db).map_err(StateError::from)?;
        Ok(Some(transient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_support::{MockDb, MockExporterPosition};
    use crate::collaborators::KvDatabase;
    use std::cell::RefCell;
    use std::fs;
    use std::io;
    use std::path::Path;
    use tempfile::TempDir;

    struct FixedFactory {
        files: Vec<(&'static str, &'static [u8])>,
    }

    impl KvDatabaseFactory for FixedFactory {
        fn open(&self, _runtime_dir: &Path, _install_from: Option<&Path>) -> io::Result<Box<dyn KvDatabase>> {
            Ok(Box::new(MockDb {
                files: self.files.clone(),
                closed: RefCell::new(false),
            }))
        }
    }

    struct RefusingFactory;

    impl KvDatabaseFactory for RefusingFactory {
        fn open(&self, _runtime_dir: &Path, _install_from: Option<&Path>) -> io::Result<Box<dyn KvDatabase>> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "refused to open"))
        }
    }

    #[test]
    fn recover_counts_runs_and_failures() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let metrics = Rc::new(MetricsRegistry::new());
        let mut controller = StateController::new(
            store,
            Box::new(RefusingFactory),
            tmp.path().join("runtime"),
            Rc::clone(&metrics),
        );

        assert!(controller.recover().is_err());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.recovery_runs, 1);
        assert_eq!(snapshot.recovery_failures, 1);
    }

    #[test]
    fn recover_failure_deletes_the_runtime_directory() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let runtime_dir = tmp.path().join("runtime");
        fs::create_dir_all(&runtime_dir).unwrap();
        fs::write(runtime_dir.join("stale"), b"leftover").unwrap();

        let mut controller = StateController::new(
            store,
            Box::new(RefusingFactory),
            runtime_dir.clone(),
            Rc::new(MetricsRegistry::new()),
        );

        assert!(controller.recover().is_err());
        assert!(!runtime_dir.exists());
    }

    #[test]
    fn recover_with_no_snapshots_opens_fresh_and_has_no_bound() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let factory = Box::new(FixedFactory { files: vec![("a", b"1")] });
        let mut controller = StateController::new(store, factory, tmp.path().join("runtime"), Rc::new(MetricsRegistry::new()));

        controller.recover().unwrap();
        assert!(controller.is_open());
        assert_eq!(controller.compaction_bound(), None);
    }

    #[test]
    fn take_transient_snapshot_is_bound_by_exporter_position() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let factory = Box::new(FixedFactory { files: vec![("a", b"1")] });
        let mut controller = StateController::new(store, factory, tmp.path().join("runtime"), Rc::new(MetricsRegistry::new()));
        controller.recover().unwrap();

        let exporter = MockExporterPosition(5);
        let id = SnapshotId::new(10, 1, 0);
        let result = controller.take_transient_snapshot(id, &exporter).unwrap();
        assert!(result.is_none(), "snapshot position 10 is ahead of exporter position 5");
    }

    #[test]
    fn take_transient_snapshot_succeeds_within_exporter_bound() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let factory = Box::new(FixedFactory { files: vec![("a", b"1")] });
        let mut controller = StateController::new(store, factory, tmp.path().join("runtime"), Rc::new(MetricsRegistry::new()));
        controller.recover().unwrap();

        let exporter = MockExporterPosition(100);
        let id = SnapshotId::new(10, 1, 5);
        let transient = controller.take_transient_snapshot(id, &exporter).unwrap();
        assert!(transient.is_some());
    }

    #[test]
    fn take_transient_snapshot_is_idempotent_once_bound_advances() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let factory = Box::new(FixedFactory { files: vec![("a", b"1")] });
        let mut controller = StateController::new(store, factory, tmp.path().join("runtime"), Rc::new(MetricsRegistry::new()));
        controller.recover().unwrap();

        let exporter = MockExporterPosition(100);
        let id = SnapshotId::new(10, 1, 5);
        let transient = controller.take_transient_snapshot(id, &exporter).unwrap().unwrap();
        transient.commit().unwrap();

        assert_eq!(controller.compaction_bound(), Some(10));
        let repeat = controller.take_transient_snapshot(id, &exporter).unwrap();
        assert!(repeat.is_none(), "a request at the current bound is a no-op");
    }

    #[test]
    fn take_transient_snapshot_on_closed_database_fails() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let factory = Box::new(FixedFactory { files: vec![("a", b"1")] });
        let mut controller = StateController::new(store, factory, tmp.path().join("runtime"), Rc::new(MetricsRegistry::new()));
        controller.recover().unwrap();
        controller.close().unwrap();

        let exporter = MockExporterPosition(100);
        let id = SnapshotId::new(10, 1, 5);
        assert!(controller.take_transient_snapshot(id, &exporter).is_err());
    }
}
