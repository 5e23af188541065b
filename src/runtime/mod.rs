//! Work-stealing runtime for tasks with dynamic or unknown costs.
//!
//! One [`WorkQueue`] per worker, no shared global queue. Owners drain their
//! queue FIFO; an owner with nothing local scans the other queues and steals
//! the tail of the longest one that clears the steal threshold. Queue locks
//! never nest, so there is no lock-ordering to get wrong.

pub mod policy;
pub mod queue;

pub use policy::{run_policy, PolicyOutcome, PolicyState, PolicyTask};
pub use queue::WorkQueue;

use std::sync::Arc;

use crate::balance::{self, BalanceStrategy};
use crate::config::{Config, DEFAULT_STEAL_THRESHOLD};
use crate::telemetry::Metrics;

/// A pool of per-worker deques with cross-worker stealing.
#[derive(Debug)]
pub struct WorkStealingScheduler<T> {
    queues: Vec<WorkQueue<T>>,
    steal_threshold: usize,
    strategy: BalanceStrategy,
    metrics: Option<Arc<Metrics>>,
}

impl<T> WorkStealingScheduler<T> {
    /// Create a scheduler with `num_workers` queues. Workers are addressed by
    /// index in `0..num_workers`.
    pub fn new(num_workers: usize, steal_threshold: usize) -> Self {
        let queues = (0..num_workers.max(1)).map(|_| WorkQueue::new()).collect();
        Self {
            queues,
            steal_threshold,
            strategy: BalanceStrategy::RoundRobin,
            metrics: None,
        }
    }

    /// A scheduler with the default steal threshold.
    pub fn with_workers(num_workers: usize) -> Self {
        Self::new(num_workers, DEFAULT_STEAL_THRESHOLD)
    }

    /// A scheduler sized and tuned from a [`Config`]: one worker per logical
    /// CPU unless the config pins a count.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.worker_threads(), config.steal_threshold)
    }

    pub fn with_strategy(mut self, strategy: BalanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn num_workers(&self) -> usize {
        self.queues.len()
    }

    pub fn steal_threshold(&self) -> usize {
        self.steal_threshold
    }

    pub fn strategy(&self) -> &BalanceStrategy {
        &self.strategy
    }

    pub(crate) fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    /// Append `item` to `worker`'s queue.
    ///
    /// Panics when `worker` is out of range.
    pub fn push(&self, worker: usize, item: T) {
        self.queues[worker].push_back(item);
        if let Some(metrics) = &self.metrics {
            metrics.record_push(worker);
        }
    }

    /// Take `worker`'s oldest local item, falling back to stealing when the
    /// local queue is empty.
    pub fn pop(&self, worker: usize) -> Option<T> {
        if let Some(item) = self.queues[worker].pop_front() {
            if let Some(metrics) = &self.metrics {
                metrics.record_pop(worker);
            }
            return Some(item);
        }
        self.steal(worker)
    }

    /// Steal the tail of the longest other queue at or above the threshold.
    ///
    /// Lengths are snapshotted one lock at a time and every lock is released
    /// before the victim's lock is re-acquired, so two queue locks are never
    /// held at once. The snapshot can go stale: a victim raced to empty just
    /// yields `None`.
    pub fn steal(&self, thief: usize) -> Option<T> {
        let mut victim: Option<(usize, usize)> = None; // (len, index)
        for (index, queue) in self.queues.iter().enumerate() {
            if index == thief {
                continue;
            }
            let len = queue.len();
            if len < self.steal_threshold.max(1) {
                continue;
            }
            match victim {
                Some((best_len, _)) if best_len >= len => {}
                _ => victim = Some((len, index)),
            }
        }

        let (_, index) = victim?;
        let item = self.queues[index].pop_back();
        if item.is_some() {
            if let Some(metrics) = &self.metrics {
                metrics.record_steal(thief);
            }
        }
        item
    }

    /// Current length of `worker`'s queue.
    pub fn len(&self, worker: usize) -> usize {
        self.queues[worker].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(WorkQueue::is_empty)
    }

    pub fn total_len(&self) -> usize {
        self.queues.iter().map(WorkQueue::len).sum()
    }

    /// Spread `items` across the worker queues using the configured strategy.
    pub fn distribute(&self, items: Vec<T>) {
        let worker_ids: Vec<usize> = (0..self.queues.len()).collect();
        let assignment = balance::apply(&self.strategy, items, &worker_ids);
        for (worker, items) in assignment {
            for item in items {
                self.push(worker, item);
            }
        }
    }
}
