//! Telemetry and observability subsystem.
//!
//! Per-worker scheduler event counters and sample statistics. Everything here
//! is in-memory; snapshots can render themselves to a JSON string, and what
//! happens to that string is up to the caller.

pub mod metrics;
pub mod stats;

pub use metrics::{Metrics, MetricsSnapshot, WorkerStats};
pub use stats::{summarize, Summary};
