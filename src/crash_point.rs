//! Crash point injection for install durability testing.
//!
//! Same mechanism the rest of the storage stack uses: set
//! `SNAPREPL_CRASH_POINT` to a point name below and the process aborts
//! the instant that point is reached - no cleanup, no unwinding. This
//! is how the "crash mid-install, then recover" scenarios are driven:
//! a test process sets the env var, runs the install loop, and expects
//! the process to die at an exact, repeatable point rather than
//! somewhere probabilistic.

use std::sync::OnceLock;

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("SNAPREPL_CRASH_POINT").ok())
        .as_deref()
}

/// Check if a specific crash point is enabled.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process immediately if `name` matches `SNAPREPL_CRASH_POINT`.
/// A no-op otherwise.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names.
pub mod points {
    /// Before a chunk's content bytes are fsynced to staging.
    pub const CHUNK_WRITE_BEFORE_FSYNC: &str = "chunk_write_before_fsync";
    /// After a chunk's content bytes are fsynced, before `write` returns.
    pub const CHUNK_WRITE_AFTER_FSYNC: &str = "chunk_write_after_fsync";
    /// After the combined checksum has verified, before the staging
    /// directory is renamed into place.
    pub const SNAPSHOT_COMMIT_BEFORE_RENAME: &str = "snapshot_commit_before_rename";
    /// After the rename, before the containing directory is fsynced.
    pub const SNAPSHOT_COMMIT_AFTER_RENAME: &str = "snapshot_commit_after_rename";
    /// After a committed snapshot's directory fsync, before retention
    /// sweep of older snapshots.
    pub const SNAPSHOT_COMMIT_BEFORE_RETENTION: &str = "snapshot_commit_before_retention";
    /// During startup sweep, after stale pending directories are listed
    /// but before any are removed.
    pub const STARTUP_BEFORE_PENDING_SWEEP: &str = "startup_before_pending_sweep";

    /// Get all crash point names.
    pub fn all() -> &'static [&'static str] {
        &[
            CHUNK_WRITE_BEFORE_FSYNC,
            CHUNK_WRITE_AFTER_FSYNC,
            SNAPSHOT_COMMIT_BEFORE_RENAME,
            SNAPSHOT_COMMIT_AFTER_RENAME,
            SNAPSHOT_COMMIT_BEFORE_RETENTION,
            STARTUP_BEFORE_PENDING_SWEEP,
        ]
    }
}
