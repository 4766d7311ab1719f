//! Metrics registry for snapshot replication.
//!
//! Per the observability design: atomics only, thread-safe but
//! lock-minimal, `Relaxed` ordering throughout (eventual consistency is
//! fine for metrics). Counters are monotonic and reset only on process
//! start, same as before; this registry additionally carries one gauge
//! (tracks a value that goes up and down - installs currently in
//! flight) and one histogram (install duration), both still built from
//! plain atomics rather than an external metrics crate.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Metrics registry containing all operational counters, the in-flight
/// gauge, and the install-duration histogram.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    snapshots_committed: AtomicU64,
    snapshots_produced: AtomicU64,
    chunks_sent: AtomicU64,
    chunks_received: AtomicU64,
    chunks_rejected: AtomicU64,
    commit_checksum_mismatches: AtomicU64,
    recovery_runs: AtomicU64,
    recovery_failures: AtomicU64,

    /// Installs currently in progress. Incremented when a
    /// `ReplicationContext` is created, decremented when it is removed
    /// (on commit or invalidation).
    installs_in_flight: AtomicI64,

    /// count / sum(ms) / min(ms) / max(ms) of completed install
    /// durations.
    install_duration_count: AtomicU64,
    install_duration_sum_ms: AtomicU64,
    install_duration_min_ms: AtomicU64,
    install_duration_max_ms: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all values at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully committed snapshot (producer or consumer
    /// side).
    pub fn increment_snapshots_committed(&self) {
        self.snapshots_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a snapshot taken locally for replication.
    pub fn increment_snapshots_produced(&self) {
        self.snapshots_produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk published to a peer.
    pub fn increment_chunks_sent(&self) {
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk accepted into staging.
    pub fn increment_chunks_received(&self) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk rejected (corrupt, duplicate, or disagreeing
    /// snapshot checksum).
    pub fn increment_chunks_rejected(&self) {
        self.chunks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a whole-snapshot checksum mismatch at commit time.
    pub fn increment_commit_checksum_mismatches(&self) {
        self.commit_checksum_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recovery attempt.
    pub fn increment_recovery_runs(&self) {
        self.recovery_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recovery failure.
    pub fn increment_recovery_failures(&self) {
        self.recovery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// An install started: bump the in-flight gauge.
    pub fn install_started(&self) {
        self.installs_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// An install ended (committed or invalidated): drop the in-flight
    /// gauge and, if `duration` is given, fold it into the histogram.
    pub fn install_ended(&self, duration: Option<Duration>) {
        self.installs_in_flight.fetch_sub(1, Ordering::Relaxed);
        if let Some(duration) = duration {
            let ms = duration.as_millis() as u64;
            self.install_duration_count.fetch_add(1, Ordering::Relaxed);
            self.install_duration_sum_ms.fetch_add(ms, Ordering::Relaxed);
            self.install_duration_min_ms
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    Some(if current == 0 { ms } else { current.min(ms) })
                })
                .ok();
            self.install_duration_max_ms
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| Some(current.max(ms)))
                .ok();
        }
    }

    /// Current value of the in-flight gauge.
    pub fn installs_in_flight(&self) -> i64 {
        self.installs_in_flight.load(Ordering::Relaxed)
    }

    /// Snapshot of all metrics at this instant.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            snapshots_committed: self.snapshots_committed.load(Ordering::Relaxed),
            snapshots_produced: self.snapshots_produced.load(Ordering::Relaxed),
            chunks_sent: self.chunks_sent.load(Ordering::Relaxed),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            chunks_rejected: self.chunks_rejected.load(Ordering::Relaxed),
            commit_checksum_mismatches: self.commit_checksum_mismatches.load(Ordering::Relaxed),
            recovery_runs: self.recovery_runs.load(Ordering::Relaxed),
            recovery_failures: self.recovery_failures.load(Ordering::Relaxed),
            installs_in_flight: self.installs_in_flight.load(Ordering::Relaxed),
            install_duration_count: self.install_duration_count.load(Ordering::Relaxed),
            install_duration_sum_ms: self.install_duration_sum_ms.load(Ordering::Relaxed),
            install_duration_min_ms: self.install_duration_min_ms.load(Ordering::Relaxed),
            install_duration_max_ms: self.install_duration_max_ms.load(Ordering::Relaxed),
        }
    }

    /// All metrics as JSON, matching the deterministic-field-ordering
    /// discipline the rest of the observability stack follows.
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"chunks_received":{},"chunks_rejected":{},"chunks_sent":{},"commit_checksum_mismatches":{},"install_duration_count":{},"install_duration_max_ms":{},"install_duration_min_ms":{},"install_duration_sum_ms":{},"installs_in_flight":{},"recovery_failures":{},"recovery_runs":{},"snapshots_committed":{},"snapshots_produced":{}}}"#,
            s.chunks_received,
            s.chunks_rejected,
            s.chunks_sent,
            s.commit_checksum_mismatches,
            s.install_duration_count,
            s.install_duration_max_ms,
            s.install_duration_min_ms,
            s.install_duration_sum_ms,
            s.installs_in_flight,
            s.recovery_failures,
            s.recovery_runs,
            s.snapshots_committed,
            s.snapshots_produced,
        )
    }
}

/// A point-in-time snapshot of all metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub snapshots_committed: u64,
    pub snapshots_produced: u64,
    pub chunks_sent: u64,
    pub chunks_received: u64,
    pub chunks_rejected: u64,
    pub commit_checksum_mismatches: u64,
    pub recovery_runs: u64,
    pub recovery_failures: u64,
    pub installs_in_flight: i64,
    pub install_duration_count: u64,
    pub install_duration_sum_ms: u64,
    pub install_duration_min_ms: u64,
    pub install_duration_max_ms: u64,
}
