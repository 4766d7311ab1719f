//! Typed seams for the systems this crate consumes but does not own:
//! the embedded state-machine database, the chunk transport, the Raft
//! log's indexed-entry lookup, and the exporter's committed position.
//!
//! Modeled on `src/recovery/startup.rs`'s generic collaborator traits
//! (`IndexRebuild`, `WalRead`, `StorageApply`, ...): small trait seams
//! so the core can be exercised with mock implementations in tests
//! instead of a real database or network transport.

use std::io;
use std::path::Path;

/// The embedded state-machine database whose data a snapshot captures
/// and whose data a committed snapshot installs back into.
pub trait KvDatabase {
    /// Write a consistent checkpoint of the current database state into
    /// `path`, which is an empty, already-created directory.
    fn create_checkpoint(&self, path: &Path) -> io::Result<()>;

    /// Close the database handle. Consumes `self` so a closed handle
    /// cannot be used again by construction, not by convention.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens (or re-opens) a `KvDatabase` at a given runtime directory.
pub trait KvDatabaseFactory {
    /// Open the database rooted at `runtime_dir`, installing it fresh
    /// from `install_from` first when that snapshot directory is given.
    fn open(&self, runtime_dir: &Path, install_from: Option<&Path>) -> io::Result<Box<dyn KvDatabase>>;
}

/// One Raft log entry's index/term, as needed to assign a `SnapshotId`
/// to a newly taken snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Log index of the entry.
    pub index: u64,
    /// Term the entry was appended in.
    pub term: u64,
}

/// Looks up the log entry covering a given processed position, so the
/// State Controller can assign a `SnapshotId` without owning the log
/// itself.
pub trait RecordEntrySupplier {
    /// The indexed entry at or covering `position`, if the log still
    /// has it.
    fn get_indexed_entry(&self, position: i64) -> Option<IndexedEntry>;
}

/// Reports how far an external exporter has processed committed
/// records, so a snapshot is never taken ahead of what has been
/// exported.
pub trait ExporterPositionSupplier {
    /// The highest position the exporter has durably processed.
    fn exporter_position(&self) -> i64;
}
