//! Observability for the snapshot replication and installation subsystem.
//!
//! - Structured, one-line-JSON-per-event logging (`Logger`/`Severity`).
//! - Deterministic, atomics-only metrics (`MetricsRegistry`).
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes control flow.
//! 2. No async or background threads.
//! 3. Deterministic output - no wall-clock timestamps in log lines that
//!    would make golden-output tests flaky.
//!
//! # Usage
//!
//! ```ignore
//! use partition_snapshot::observability::{Logger, MetricsRegistry};
//!
//! Logger::info("SNAPSHOT_INSTALL_COMPLETE", &[("snapshot_id", "100-2-0")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_snapshots_committed();
//! ```

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
