//! Budget- and deadline-constrained task draining.
//!
//! Tasks flow through one bounded channel whose sender is cloned into every
//! worker; a worker that finds the policy violated after executing a task
//! re-enqueues it instead of accounting it, so the system degrades by
//! slowdown rather than by losing work. A global drain-attempt budget bounds
//! the re-enqueue loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::power::EnergyMeter;
use crate::runtime::WorkStealingScheduler;
use crate::telemetry::Metrics;

/// Mutable budget/deadline pair guarded by a single mutex for the whole run.
#[derive(Debug)]
pub struct PolicyState {
    /// Joules still spendable. Never observed below zero.
    pub energy_budget_joules: f64,
    /// Absolute wallclock cutoff.
    pub deadline: Instant,
}

impl PolicyState {
    pub fn new(energy_budget_joules: f64, deadline: Instant) -> Self {
        Self {
            energy_budget_joules,
            deadline,
        }
    }
}

/// One unit of work submitted to [`run_policy`].
pub struct PolicyTask {
    pub id: String,
    /// Known energy cost in joules; when absent the measured duration times
    /// the configured flat wattage is charged.
    pub estimated_energy: Option<f64>,
    work: Box<dyn FnMut() + Send + 'static>,
}

impl PolicyTask {
    pub fn new<S, F>(id: S, work: F) -> Self
    where
        S: Into<String>,
        F: FnMut() + Send + 'static,
    {
        Self {
            id: id.into(),
            estimated_energy: None,
            work: Box::new(work),
        }
    }

    pub fn with_estimated_energy(mut self, joules: f64) -> Self {
        self.estimated_energy = Some(joules);
        self
    }
}

impl fmt::Debug for PolicyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyTask")
            .field("id", &self.id)
            .field("estimated_energy", &self.estimated_energy)
            .finish()
    }
}

/// How a policy run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Every task was executed and paid for.
    Completed,
    /// The deadline passed; these tasks were drained without execution.
    DeadlineExpired { drained_ids: Vec<String> },
    /// The remaining budget could not afford these tasks.
    BudgetExhausted { remaining_ids: Vec<String> },
}

struct Shared {
    state: Mutex<PolicyState>,
    outstanding: AtomicUsize,
    done: AtomicBool,
    attempts_left: AtomicUsize,
    expired: Mutex<Vec<String>>,
    deferred: Mutex<Vec<String>>,
    meter: EnergyMeter,
    fixed_watts: f64,
}

impl Shared {
    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.store(true, Ordering::Release);
        }
    }

    fn take_attempt(&self) -> bool {
        self.attempts_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Drain `tasks` under `state`'s energy budget and deadline, using one OS
/// thread per scheduler worker.
///
/// Returns the wallclock duration of the run and its outcome, or an error
/// when a worker thread cannot be spawned. Tasks that the budget cannot
/// afford end up in
/// [`BudgetExhausted::remaining_ids`](PolicyOutcome::BudgetExhausted); tasks
/// admitted after the deadline are dropped into
/// [`DeadlineExpired::drained_ids`](PolicyOutcome::DeadlineExpired).
pub fn run_policy(
    scheduler: &WorkStealingScheduler<PolicyTask>,
    tasks: Vec<PolicyTask>,
    state: PolicyState,
    config: &Config,
) -> Result<(Duration, PolicyOutcome)> {
    let run_start = Instant::now();
    let task_count = tasks.len();
    if task_count == 0 {
        return Ok((run_start.elapsed(), PolicyOutcome::Completed));
    }

    let shared = Shared {
        state: Mutex::new(state),
        outstanding: AtomicUsize::new(task_count),
        done: AtomicBool::new(false),
        attempts_left: AtomicUsize::new(config.drain_attempt_factor.saturating_mul(task_count)),
        expired: Mutex::new(Vec::new()),
        deferred: Mutex::new(Vec::new()),
        meter: EnergyMeter::new(),
        fixed_watts: config.fixed_cpu_watts,
    };

    // Sized for the whole submission, so a re-enqueue can never block: at
    // most `task_count` envelopes exist at any moment.
    let (tx, rx) = bounded::<PolicyTask>(task_count);
    for task in tasks {
        tx.send(task).expect("channel sized for the submission");
    }

    std::thread::scope(|scope| -> Result<()> {
        for worker in 0..scheduler.num_workers() {
            let rx = rx.clone();
            let tx = tx.clone();
            let metrics = scheduler.metrics().cloned();
            let shared = &shared;
            std::thread::Builder::new()
                .name(format!("{}-{worker}", config.thread_name_prefix))
                .spawn_scoped(scope, move || worker_loop(shared, worker, rx, tx, metrics))
                .map_err(|e| Error::runtime(format!("spawn failed: {e}")))?;
        }
        drop(tx);
        drop(rx);
        Ok(())
    })?;

    let elapsed = run_start.elapsed();
    let expired = shared.expired.into_inner();
    let deferred = shared.deferred.into_inner();
    let outcome = if !expired.is_empty() {
        PolicyOutcome::DeadlineExpired { drained_ids: expired }
    } else if !deferred.is_empty() {
        PolicyOutcome::BudgetExhausted {
            remaining_ids: deferred,
        }
    } else {
        PolicyOutcome::Completed
    };
    Ok((elapsed, outcome))
}

fn worker_loop(
    shared: &Shared,
    worker: usize,
    rx: Receiver<PolicyTask>,
    tx: Sender<PolicyTask>,
    metrics: Option<Arc<Metrics>>,
) {
    loop {
        if shared.done.load(Ordering::Acquire) {
            break;
        }
        let mut task = match rx.recv_timeout(Duration::from_millis(1)) {
            Ok(task) => task,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // Admission: past the deadline nothing executes, the queue drains.
        let expired = {
            let state = shared.state.lock();
            Instant::now() >= state.deadline
        };
        if expired {
            shared.expired.lock().push(task.id.clone());
            shared.finish_one();
            continue;
        }

        let exec_start = Instant::now();
        (task.work)();
        let duration = exec_start.elapsed();
        if let Some(metrics) = &metrics {
            metrics.record_execution(worker, duration.as_nanos() as u64);
        }

        let estimate = task
            .estimated_energy
            .unwrap_or_else(|| duration.as_secs_f64() * shared.fixed_watts);

        let mut state = shared.state.lock();
        let violates = Instant::now() + duration > state.deadline
            || state.energy_budget_joules < estimate;
        if violates {
            drop(state);
            if shared.take_attempt() {
                match tx.send(task) {
                    Ok(()) => continue,
                    Err(err) => task = err.into_inner(),
                }
            }
            shared.deferred.lock().push(task.id.clone());
            shared.finish_one();
        } else {
            state.energy_budget_joules -= estimate;
            drop(state);
            shared.meter.charge(estimate);
            shared.finish_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[test]
    fn test_all_tasks_complete_under_generous_policy() {
        let scheduler = WorkStealingScheduler::<PolicyTask>::new(2, 1);
        let tasks: Vec<PolicyTask> = (0..8)
            .map(|i| PolicyTask::new(format!("t{i}"), || {}).with_estimated_energy(1.0))
            .collect();
        let state = PolicyState::new(100.0, far_deadline());
        let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
        assert_eq!(outcome, PolicyOutcome::Completed);
    }

    #[test]
    fn test_budget_exhaustion_defers_unaffordable_tasks() {
        let scheduler = WorkStealingScheduler::<PolicyTask>::new(2, 1);
        let tasks: Vec<PolicyTask> = (0..10)
            .map(|i| PolicyTask::new(format!("t{i}"), || {}).with_estimated_energy(5.0))
            .collect();
        let state = PolicyState::new(30.0, far_deadline());
        let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
        match outcome {
            PolicyOutcome::BudgetExhausted { remaining_ids } => {
                assert_eq!(remaining_ids.len(), 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_expired_deadline_drains_without_execution() {
        let scheduler = WorkStealingScheduler::<PolicyTask>::new(2, 1);
        let executed = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<PolicyTask> = (0..4)
            .map(|i| {
                let executed = executed.clone();
                PolicyTask::new(format!("t{i}"), move || {
                    executed.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();
        let state = PolicyState::new(1000.0, Instant::now() - Duration::from_secs(1));
        let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
        match outcome {
            PolicyOutcome::DeadlineExpired { drained_ids } => {
                assert_eq!(drained_ids.len(), 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(executed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_empty_submission_completes() {
        let scheduler = WorkStealingScheduler::<PolicyTask>::new(1, 1);
        let state = PolicyState::new(0.0, far_deadline());
        let (_, outcome) = run_policy(&scheduler, Vec::new(), state, &Config::default()).unwrap();
        assert_eq!(outcome, PolicyOutcome::Completed);
    }
}
