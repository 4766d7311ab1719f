//! End-to-end scenarios for snapshot replication and installation,
//! exercised across the public API as a peer node would: produce chunks
//! from a committed snapshot, feed them through a `ReplicationController`,
//! and recover a `StateController` from whatever lands in the store.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;

use partition_snapshot::chunk::{checksum_of_content, combined_checksum, SnapshotChunk};
use partition_snapshot::collaborators::{ExporterPositionSupplier, KvDatabase, KvDatabaseFactory};
use partition_snapshot::observability::MetricsRegistry;
use partition_snapshot::reader::ChunkReader;
use partition_snapshot::replication::{ReplicationController, SnapshotTransport, ReplicationResult};
use partition_snapshot::state::StateController;
use partition_snapshot::store::{SnapshotId, SnapshotStore};

/// Transport that just records published chunks; the scenarios below
/// drive installation directly from those chunks rather than simulating
/// a network.
#[derive(Default)]
struct RecordingTransport {
    published: RefCell<Vec<SnapshotChunk>>,
}

impl SnapshotTransport for RecordingTransport {
    fn publish(&self, chunk: &SnapshotChunk) -> ReplicationResult<()> {
        self.published.borrow_mut().push(chunk.clone());
        Ok(())
    }
}

/// A `KvDatabase`/`KvDatabaseFactory` pair that actually persists to a
/// runtime directory on disk, so `recover` can be exercised end to end
/// rather than through an in-memory mock.
struct DiskDb {
    runtime_dir: std::path::PathBuf,
}

impl KvDatabase for DiskDb {
    fn create_checkpoint(&self, path: &Path) -> io::Result<()> {
        for entry in fs::read_dir(&self.runtime_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                fs::copy(entry.path(), path.join(entry.file_name()))?;
            }
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

struct DiskDbFactory;

impl KvDatabaseFactory for DiskDbFactory {
    fn open(&self, runtime_dir: &Path, install_from: Option<&Path>) -> io::Result<Box<dyn KvDatabase>> {
        if runtime_dir.exists() {
            fs::remove_dir_all(runtime_dir)?;
        }
        fs::create_dir_all(runtime_dir)?;
        if let Some(src) = install_from {
            for entry in fs::read_dir(src)? {
                let entry = entry?;
                if entry.path().is_file() && entry.file_name() != "manifest.json" {
                    fs::copy(entry.path(), runtime_dir.join(entry.file_name()))?;
                }
            }
        }
        Ok(Box::new(DiskDb { runtime_dir: runtime_dir.to_path_buf() }))
    }
}

/// A factory whose `open` always fails, modeling a database that
/// refuses to open a committed snapshot's data.
struct RefusingFactory;

impl KvDatabaseFactory for RefusingFactory {
    fn open(&self, _runtime_dir: &Path, _install_from: Option<&Path>) -> io::Result<Box<dyn KvDatabase>> {
        Err(io::Error::new(io::ErrorKind::InvalidData, "refused to open"))
    }
}

struct FixedExporterPosition(i64);

impl ExporterPositionSupplier for FixedExporterPosition {
    fn exporter_position(&self) -> i64 {
        self.0
    }
}

fn commit_three_chunk_snapshot(store: &SnapshotStore, id: SnapshotId) {
    let staging = store.pending_directory_for(id);
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("0000000001"), [0x01u8]).unwrap();
    fs::write(staging.join("0000000002"), [0x02u8]).unwrap();
    fs::write(staging.join("0000000003"), [0x03u8]).unwrap();
    let checksums: Vec<u64> = [[0x01u8], [0x02u8], [0x03u8]]
        .iter()
        .map(|b| checksum_of_content(b))
        .collect();
    store.commit_snapshot(id, &staging, combined_checksum(checksums)).unwrap();
}

fn read_all_chunks(store: &SnapshotStore, id: SnapshotId) -> Vec<SnapshotChunk> {
    let snapshot = store.latest_snapshot().unwrap().unwrap();
    assert_eq!(snapshot.id(), id);
    let mut reader = ChunkReader::open(&snapshot).unwrap();
    let chunks = std::iter::from_fn(|| reader.next().unwrap()).collect();
    reader.close();
    chunks
}

/// Scenario 1: happy path, follower receives chunks out of order
/// relative to their file names but completes on the final one.
#[test]
fn scenario_happy_path_commits_after_final_chunk() {
    let leader_tmp = TempDir::new().unwrap();
    let leader_store = SnapshotStore::open(leader_tmp.path()).unwrap();
    let id = SnapshotId::new(100, 2, 0);
    commit_three_chunk_snapshot(&leader_store, id);
    let chunks = read_all_chunks(&leader_store, id);
    let (a, b, c) = (chunks[0].clone(), chunks[1].clone(), chunks[2].clone());

    let follower_tmp = TempDir::new().unwrap();
    let follower_store = SnapshotStore::open(follower_tmp.path()).unwrap();
    let metrics = Rc::new(MetricsRegistry::new());
    let mut controller = ReplicationController::new(
        follower_store.clone(),
        Box::new(RecordingTransport::default()),
        Rc::clone(&metrics),
    );

    assert!(controller.on_chunk(c).unwrap().is_none());
    assert!(controller.on_chunk(a).unwrap().is_none());
    let committed = controller.on_chunk(b).unwrap();
    assert!(committed.is_some(), "commit must happen on the chunk that completes the set");

    let latest = follower_store.latest_snapshot().unwrap().unwrap();
    assert_eq!(latest.id().index(), 100);

    let runtime_dir = follower_tmp.path().join("runtime");
    let mut state = StateController::new(follower_store, Box::new(DiskDbFactory), runtime_dir.clone(), Rc::new(MetricsRegistry::new()));
    state.recover().unwrap();
    let mut names: Vec<_> = fs::read_dir(&runtime_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["0000000001", "0000000002", "0000000003"]);
}

/// Scenario 2: a corrupt chunk invalidates the install; the rest of the
/// set for that id is dropped, and nothing is ever committed.
#[test]
fn scenario_corrupt_chunk_invalidates_and_drops_remainder() {
    let leader_tmp = TempDir::new().unwrap();
    let leader_store = SnapshotStore::open(leader_tmp.path()).unwrap();
    let id = SnapshotId::new(100, 2, 0);
    commit_three_chunk_snapshot(&leader_store, id);
    let mut chunks = read_all_chunks(&leader_store, id);
    // chunk b arrives with content [0x02] but a checksum computed for [0x09].
    chunks[1].checksum = checksum_of_content(&[0x09]);

    let follower_tmp = TempDir::new().unwrap();
    let follower_store = SnapshotStore::open(follower_tmp.path()).unwrap();
    let mut controller = ReplicationController::new(
        follower_store.clone(),
        Box::new(RecordingTransport::default()),
        Rc::new(MetricsRegistry::new()),
    );

    assert!(controller.on_chunk(chunks[1].clone()).unwrap().is_none(), "a corrupt chunk never completes an install");
    assert!(controller.on_chunk(chunks[0].clone()).unwrap().is_none());
    assert!(controller.on_chunk(chunks[2].clone()).unwrap().is_none());

    assert!(follower_store.latest_snapshot().unwrap().is_none());
    assert_eq!(controller.tracked_install_count(), 1);
}

/// Scenario 3: two snapshots' chunks interleave; both progress
/// independently and the store's notion of "latest" tracks whichever
/// committed most recently, regardless of install order.
#[test]
fn scenario_interleaved_snapshots_progress_independently() {
    let leader_tmp = TempDir::new().unwrap();
    let leader_store = SnapshotStore::open(leader_tmp.path()).unwrap();
    let id_low = SnapshotId::new(100, 2, 0);
    let id_high = SnapshotId::new(150, 2, 0);
    commit_three_chunk_snapshot(&leader_store, id_low);
    let chunks_low = read_all_chunks(&leader_store, id_low);

    // Reopen a second leader-side store rooted elsewhere for the second
    // snapshot, then read its chunks back the same way.
    let leader_tmp_2 = TempDir::new().unwrap();
    let leader_store_2 = SnapshotStore::open(leader_tmp_2.path()).unwrap();
    commit_three_chunk_snapshot(&leader_store_2, id_high);
    let chunks_high = read_all_chunks(&leader_store_2, id_high);

    let follower_tmp = TempDir::new().unwrap();
    let follower_store = SnapshotStore::open(follower_tmp.path()).unwrap();
    let mut controller = ReplicationController::new(
        follower_store.clone(),
        Box::new(RecordingTransport::default()),
        Rc::new(MetricsRegistry::new()),
    );

    controller.on_chunk(chunks_low[0].clone()).unwrap();
    controller.on_chunk(chunks_high[0].clone()).unwrap();
    controller.on_chunk(chunks_low[1].clone()).unwrap();
    controller.on_chunk(chunks_high[1].clone()).unwrap();
    let high_done = controller.on_chunk(chunks_high[2].clone()).unwrap();
    assert!(high_done.is_some(), "150-2-0 completes first");
    assert_eq!(follower_store.latest_snapshot().unwrap().unwrap().id().index(), 150);

    let low_done = controller.on_chunk(chunks_low[2].clone()).unwrap();
    assert!(low_done.is_some(), "100-2-0 is still accepted by the store even though it is now stale");
    assert!(follower_store.exists(id_low));
    assert_eq!(
        follower_store.latest_snapshot().unwrap().unwrap().id().index(),
        150,
        "latest_snapshot still reports the higher index after the lower one lands"
    );
}

/// Scenario 4: a crash mid-install (only two of three chunks written)
/// leaves a staging directory the next startup sweep must remove.
#[test]
fn scenario_crash_mid_install_is_swept_on_restart() {
    let leader_tmp = TempDir::new().unwrap();
    let leader_store = SnapshotStore::open(leader_tmp.path()).unwrap();
    let id = SnapshotId::new(100, 2, 0);
    commit_three_chunk_snapshot(&leader_store, id);
    let chunks = read_all_chunks(&leader_store, id);

    let follower_tmp = TempDir::new().unwrap();
    let follower_store = SnapshotStore::open(follower_tmp.path()).unwrap();
    {
        let mut controller = ReplicationController::new(
            follower_store.clone(),
            Box::new(RecordingTransport::default()),
            Rc::new(MetricsRegistry::new()),
        );
        assert!(controller.on_chunk(chunks[0].clone()).unwrap().is_none());
        assert!(controller.on_chunk(chunks[1].clone()).unwrap().is_none());
        // Process "crashes" here: controller and its in-memory
        // received_snapshots map are dropped without chunk 3 arriving.
    }

    let staging_dir = follower_store.pending_directory_for(id);
    assert!(staging_dir.exists(), "the staging directory survives the simulated crash");

    // Restart: reopening the store sweeps every entry under pending/.
    drop(follower_store);
    let reopened = SnapshotStore::open(follower_tmp.path()).unwrap();
    assert!(!staging_dir.exists(), "startup sweep must remove incomplete staging directories");
    assert!(!reopened.exists(id), "no committed snapshot at 100 after the crash");
}

/// Scenario 5: recovering from a store whose latest commit is 200-3-0
/// opens the database fresh from that snapshot's files.
#[test]
fn scenario_recover_from_latest_snapshot_succeeds() {
    let tmp = TempDir::new().unwrap();
    let store = SnapshotStore::open(tmp.path()).unwrap();
    let id = SnapshotId::new(200, 3, 0);
    commit_three_chunk_snapshot(&store, id);

    let runtime_dir = tmp.path().join("runtime");
    fs::create_dir_all(&runtime_dir).unwrap();
    fs::write(runtime_dir.join("stale"), b"must be wiped").unwrap();

    let mut state = StateController::new(store.clone(), Box::new(DiskDbFactory), runtime_dir.clone(), Rc::new(MetricsRegistry::new()));
    state.recover().unwrap();

    assert!(state.is_open());
    assert_eq!(state.compaction_bound(), Some(200));
    assert!(!runtime_dir.join("stale").exists(), "recover installs a fresh copy, not a merge with stale state");
    assert!(runtime_dir.join("0000000001").exists());
}

/// Scenario 6: recovering when the database refuses to open a
/// committed snapshot surfaces an unrecoverable, not merely
/// recoverable, error.
#[test]
fn scenario_unreadable_snapshot_is_unrecoverable() {
    let tmp = TempDir::new().unwrap();
    let store = SnapshotStore::open(tmp.path()).unwrap();
    let id = SnapshotId::new(200, 3, 0);
    commit_three_chunk_snapshot(&store, id);

    let runtime_dir = tmp.path().join("runtime");
    fs::create_dir_all(&runtime_dir).unwrap();
    fs::write(runtime_dir.join("stale"), b"must not survive a failed recover").unwrap();

    let mut state = StateController::new(store, Box::new(RefusingFactory), runtime_dir.clone(), Rc::new(MetricsRegistry::new()));

    let err = state.recover().unwrap_err();
    assert!(err.is_fatal(), "a committed snapshot that cannot be opened must halt the partition");
    assert!(!state.is_open());
    assert!(!runtime_dir.exists(), "a failed recover must not leave a partially installed runtime directory behind");
}

/// Invariant: `latestSnapshot().index` is monotonically non-decreasing
/// as new snapshots commit on a node, even when an older-but-still-valid
/// snapshot commits after a newer one.
#[test]
fn invariant_latest_index_is_monotonically_non_decreasing() {
    let tmp = TempDir::new().unwrap();
    let store = SnapshotStore::open(tmp.path()).unwrap();

    commit_three_chunk_snapshot(&store, SnapshotId::new(10, 1, 0));
    assert_eq!(store.latest_snapshot().unwrap().unwrap().id().index(), 10);

    commit_three_chunk_snapshot(&store, SnapshotId::new(20, 1, 0));
    assert_eq!(store.latest_snapshot().unwrap().unwrap().id().index(), 20);

    // An older id landing afterwards (e.g. a slow peer finishing its own
    // install) does not move `latest_snapshot` backwards.
    commit_three_chunk_snapshot(&store, SnapshotId::new(15, 1, 0));
    assert_eq!(store.latest_snapshot().unwrap().unwrap().id().index(), 20);
}

/// Round-trip law: reading a committed snapshot's chunks and writing
/// them into a fresh install on another store reproduces identical
/// content and an identical combined checksum.
#[test]
fn round_trip_through_chunk_reader_and_replication_preserves_content() {
    let leader_tmp = TempDir::new().unwrap();
    let leader_store = SnapshotStore::open(leader_tmp.path()).unwrap();
    let id = SnapshotId::new(7, 1, 0);
    commit_three_chunk_snapshot(&leader_store, id);
    let source = leader_store.latest_snapshot().unwrap().unwrap();
    let chunks = read_all_chunks(&leader_store, id);

    let follower_tmp = TempDir::new().unwrap();
    let follower_store = SnapshotStore::open(follower_tmp.path()).unwrap();
    let mut controller = ReplicationController::new(
        follower_store.clone(),
        Box::new(RecordingTransport::default()),
        Rc::new(MetricsRegistry::new()),
    );
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(controller.on_chunk(chunk.clone()).unwrap().is_none());
    }
    let committed = controller.on_chunk(chunks.last().unwrap().clone()).unwrap().unwrap();

    assert_eq!(committed.checksum(), source.checksum());
    for name in ["0000000001", "0000000002", "0000000003"] {
        let original = fs::read(source.path().join(name)).unwrap();
        let copy = fs::read(committed.path().join(name)).unwrap();
        assert_eq!(original, copy);
    }
}
