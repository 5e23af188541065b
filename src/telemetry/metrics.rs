//! Scheduler event accounting.
//!
//! Counters are sliced per worker rather than pooled, so queue imbalance and
//! steal pressure stay visible in a snapshot instead of washing out in a
//! crate-wide total.

use std::sync::atomic::{AtomicU64, Ordering};

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::telemetry::stats;

/// One worker's slice of the event counters.
#[derive(Debug, Default)]
struct WorkerCounters {
    pushed: AtomicU64,
    popped: AtomicU64,
    stolen: AtomicU64,
    executed: AtomicU64,
}

impl WorkerCounters {
    fn stats(&self) -> WorkerStats {
        WorkerStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            stolen: self.stolen.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        self.pushed.store(0, Ordering::Relaxed);
        self.popped.store(0, Ordering::Relaxed);
        self.stolen.store(0, Ordering::Relaxed);
        self.executed.store(0, Ordering::Relaxed);
    }
}

/// Event accounting for one scheduler, shared between its workers.
///
/// Steals are charged to the thief, not the victim.
#[derive(Debug)]
pub struct Metrics {
    workers: Vec<WorkerCounters>,
    latency_ns: Mutex<Histogram<u64>>,
}

impl Metrics {
    /// Accounting sized for a pool of `num_workers` workers.
    pub fn for_workers(num_workers: usize) -> Self {
        Self {
            workers: (0..num_workers.max(1))
                .map(|_| WorkerCounters::default())
                .collect(),
            // Auto-resizing, three significant figures.
            latency_ns: Mutex::new(Histogram::new(3).expect("sigfig in 0..=5")),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    // Out-of-range worker ids share the last slice rather than panicking:
    // accounting must never take down the scheduler it observes.
    fn slice(&self, worker: usize) -> &WorkerCounters {
        &self.workers[worker.min(self.workers.len() - 1)]
    }

    pub fn record_push(&self, worker: usize) {
        self.slice(worker).pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pop(&self, worker: usize) {
        self.slice(worker).popped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_steal(&self, thief: usize) {
        self.slice(thief).stolen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one task execution on `worker` with its duration.
    pub fn record_execution(&self, worker: usize, duration_ns: u64) {
        self.slice(worker).executed.fetch_add(1, Ordering::Relaxed);
        let _ = self.latency_ns.lock().record(duration_ns);
    }

    /// Capture the current counters and latency quantiles.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let per_worker: Vec<WorkerStats> = self.workers.iter().map(WorkerCounters::stats).collect();
        let latency = self.latency_ns.lock();
        MetricsSnapshot {
            per_worker,
            latency_mean_ns: if latency.len() == 0 { 0.0 } else { latency.mean() },
            latency_p95_ns: latency.value_at_quantile(0.95),
            latency_p99_ns: latency.value_at_quantile(0.99),
            latency_max_ns: latency.max(),
        }
    }

    pub fn reset(&self) {
        for worker in &self.workers {
            worker.clear();
        }
        self.latency_ns.lock().reset();
    }
}

/// One worker's counters at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WorkerStats {
    pub pushed: u64,
    pub popped: u64,
    pub stolen: u64,
    pub executed: u64,
}

/// Point-in-time view of a scheduler's activity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub per_worker: Vec<WorkerStats>,
    pub latency_mean_ns: f64,
    pub latency_p95_ns: u64,
    pub latency_p99_ns: u64,
    pub latency_max_ns: u64,
}

impl MetricsSnapshot {
    pub fn total_pushed(&self) -> u64 {
        self.per_worker.iter().map(|w| w.pushed).sum()
    }

    pub fn total_popped(&self) -> u64 {
        self.per_worker.iter().map(|w| w.popped).sum()
    }

    pub fn total_stolen(&self) -> u64 {
        self.per_worker.iter().map(|w| w.stolen).sum()
    }

    pub fn total_executed(&self) -> u64 {
        self.per_worker.iter().map(|w| w.executed).sum()
    }

    /// Share of dequeues that crossed worker boundaries.
    pub fn steal_ratio(&self) -> f64 {
        let total = self.total_popped() + self.total_stolen();
        if total == 0 {
            return 0.0;
        }
        self.total_stolen() as f64 / total as f64
    }

    /// Coefficient of variation of per-worker executed counts. Zero means a
    /// perfectly even pool; rising values mean work is pooling on few
    /// workers.
    pub fn execution_imbalance(&self) -> f64 {
        let executed: Vec<f64> = self.per_worker.iter().map(|w| w.executed as f64).collect();
        match stats::summarize(&executed) {
            Some(summary) if summary.mean > 0.0 => summary.std_dev / summary.mean,
            _ => 0.0,
        }
    }

    /// Render the snapshot as a JSON string. Purely in-memory; persisting or
    /// shipping it is the caller's business.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::invalid_value(format!("snapshot serialization failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_stay_per_worker() {
        let metrics = Metrics::for_workers(3);
        metrics.record_push(0);
        metrics.record_push(0);
        metrics.record_pop(0);
        metrics.record_steal(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.per_worker[0].pushed, 2);
        assert_eq!(snapshot.per_worker[0].popped, 1);
        assert_eq!(snapshot.per_worker[1].pushed, 0);
        assert_eq!(snapshot.per_worker[2].stolen, 1);
        assert_eq!(snapshot.total_pushed(), 2);
        assert_eq!(snapshot.total_stolen(), 1);
    }

    #[test]
    fn test_out_of_range_worker_shares_last_slice() {
        let metrics = Metrics::for_workers(2);
        metrics.record_push(99);
        assert_eq!(metrics.snapshot().per_worker[1].pushed, 1);
    }

    #[test]
    fn test_steal_ratio_mixes_pops_and_steals() {
        let metrics = Metrics::for_workers(2);
        metrics.record_pop(0);
        metrics.record_pop(0);
        metrics.record_pop(1);
        metrics.record_steal(1);
        assert_eq!(metrics.snapshot().steal_ratio(), 0.25);
    }

    #[test]
    fn test_imbalance_signal() {
        let metrics = Metrics::for_workers(2);
        metrics.record_execution(0, 100);
        metrics.record_execution(0, 100);
        metrics.record_execution(1, 100);
        metrics.record_execution(1, 100);
        let even = metrics.snapshot().execution_imbalance();
        assert_eq!(even, 0.0);

        metrics.record_execution(0, 100);
        metrics.record_execution(0, 100);
        let skewed = metrics.snapshot().execution_imbalance();
        assert!(skewed > even);
    }

    #[test]
    fn test_latency_quantiles_from_executions() {
        let metrics = Metrics::for_workers(1);
        for ns in [1_000u64, 2_000, 4_000, 8_000] {
            metrics.record_execution(0, ns);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_executed(), 4);
        assert!(snapshot.latency_mean_ns > 0.0);
        assert!(snapshot.latency_max_ns >= snapshot.latency_p95_ns);
    }

    #[test]
    fn test_reset_clears_every_slice() {
        let metrics = Metrics::for_workers(2);
        metrics.record_push(0);
        metrics.record_execution(1, 500);
        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_pushed(), 0);
        assert_eq!(snapshot.total_executed(), 0);
        assert_eq!(snapshot.latency_max_ns, 0);
    }

    #[test]
    fn test_json_render_is_in_memory() {
        let metrics = Metrics::for_workers(2);
        metrics.record_push(0);
        let json = metrics.snapshot().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["per_worker"][0]["pushed"], 1);
    }
}
