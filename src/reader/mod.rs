//! Lazy, resumable, ascending reader over a snapshot's chunk files.
//!
//! Reads one file into memory at a time; large snapshots never require
//! the whole snapshot resident in memory at once.

use std::fs;
use std::path::PathBuf;

use crate::chunk::SnapshotChunk;
use crate::store::{Snapshot, SnapshotId, StoreError, StoreResult};

/// Iterates a snapshot's content files in ascending name order, producing
/// one `SnapshotChunk` per file.
pub struct ChunkReader {
    snapshot_id: SnapshotId,
    snapshot_checksum: u64,
    files: Vec<PathBuf>,
    position: usize,
    closed: bool,
}

impl ChunkReader {
    /// Open a reader over an already-committed snapshot.
    pub fn open(snapshot: &Snapshot) -> StoreResult<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(snapshot.path())
            .map_err(|e| StoreError::io_failure("listing snapshot directory", e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.file_name().map(|n| n != "manifest.json").unwrap_or(false))
            .collect();
        files.sort();

        Ok(Self {
            snapshot_id: snapshot.id(),
            snapshot_checksum: snapshot.checksum(),
            files,
            position: 0,
            closed: false,
        })
    }

    /// Total number of chunks this reader will yield.
    pub fn total_count(&self) -> u32 {
        self.files.len() as u32
    }

    /// Whether another chunk is available.
    pub fn has_next(&self) -> bool {
        !self.closed && self.position < self.files.len()
    }

    /// The file name of the next chunk without consuming it.
    pub fn peek_next_id(&self) -> Option<String> {
        if self.closed {
            return None;
        }
        self.files
            .get(self.position)
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
    }

    /// Read and return the next chunk, advancing the cursor.
    ///
    /// Returns `Ok(None)` once exhausted or after `close`.
    pub fn next(&mut self) -> StoreResult<Option<SnapshotChunk>> {
        if !self.has_next() {
            return Ok(None);
        }
        let path = &self.files[self.position];
        let chunk_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let content = fs::read(path).map_err(|e| StoreError::io_failure("reading chunk file", e))?;
        let chunk = SnapshotChunk::new(
            self.snapshot_id.to_string(),
            self.total_count(),
            chunk_name,
            content,
            self.snapshot_checksum,
        );
        self.position += 1;
        Ok(Some(chunk))
    }

    /// Reposition the cursor so the next `next()` yields the chunk with
    /// the smallest name strictly greater than `chunk_name`.
    ///
    /// `None` is a no-op, so callers can unconditionally call
    /// `seek(resume_point)` without special-casing a fresh transfer.
    /// A name that is not found leaves the cursor unchanged.
    pub fn seek(&mut self, chunk_name: Option<&str>) {
        let Some(name) = chunk_name else {
            return;
        };
        if let Some(index) = self
            .files
            .iter()
            .position(|p| p.file_name().and_then(|n| n.to_str()) == Some(name))
        {
            self.position = index + 1;
        }
    }

    /// Release the reader. Idempotent; subsequent `next` calls return
    /// `Ok(None)`.
    pub fn close(&mut self) {
        self.closed = true;
        self.files.clear();
    }
}
