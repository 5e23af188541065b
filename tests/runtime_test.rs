//! Work-stealing runtime and policy scheduler integration tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ergon::prelude::*;

#[test]
fn test_hundred_items_stolen_to_exhaustion() {
    let scheduler = WorkStealingScheduler::new(4, 1);
    for i in 0..100 {
        scheduler.push(0, i);
    }

    // Worker 1 owns nothing; every pop must come through a steal until the
    // victim runs dry.
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let item = scheduler.pop(1).expect("victim still has items");
        assert!(seen.insert(item), "item {item} returned twice");
    }
    assert_eq!(seen.len(), 100);
    assert_eq!(scheduler.pop(1), None);
    assert_eq!(scheduler.pop(0), None);
}

#[test]
fn test_high_threshold_disables_stealing() {
    let scheduler = WorkStealingScheduler::new(2, 1000);
    for i in 0..50 {
        scheduler.push(0, i);
    }
    assert_eq!(scheduler.steal(1), None);
    assert_eq!(scheduler.pop(1), None);
    // The owner still drains its queue in FIFO order.
    assert_eq!(scheduler.pop(0), Some(0));
}

#[test]
fn test_concurrent_drain_delivers_each_item_once() {
    let scheduler = Arc::new(WorkStealingScheduler::new(4, 1));
    let total = 1000;
    for i in 0..total {
        scheduler.push(i % 4, i);
    }

    let collected = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for worker in 0..4 {
        let scheduler = scheduler.clone();
        let collected = collected.clone();
        handles.push(std::thread::spawn(move || loop {
            match scheduler.pop(worker) {
                Some(item) => collected.lock().push(item),
                None => break,
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let collected = collected.lock();
    let unique: HashSet<usize> = collected.iter().copied().collect();
    assert_eq!(collected.len(), total);
    assert_eq!(unique.len(), total);
    assert!(scheduler.is_empty());
}

#[test]
fn test_metrics_observe_steals() {
    let metrics = Arc::new(Metrics::for_workers(2));
    let scheduler = WorkStealingScheduler::new(2, 1).with_metrics(metrics.clone());
    scheduler.push(0, 1);
    scheduler.push(0, 2);
    let _ = scheduler.pop(0);
    let _ = scheduler.pop(1);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.per_worker[0].pushed, 2);
    assert_eq!(snapshot.per_worker[0].popped, 1);
    // The second pop crossed worker boundaries and is charged to the thief.
    assert_eq!(snapshot.per_worker[1].stolen, 1);
    assert_eq!(snapshot.total_pushed(), 2);
    assert_eq!(snapshot.steal_ratio(), 0.5);
}

#[test]
fn test_policy_budget_allows_exactly_affordable_prefix() {
    let scheduler = WorkStealingScheduler::<PolicyTask>::new(3, 1);
    let tasks: Vec<PolicyTask> = (0..10)
        .map(|i| PolicyTask::new(format!("job{i}"), || {}).with_estimated_energy(5.0))
        .collect();
    let state = PolicyState::new(30.0, Instant::now() + Duration::from_secs(60));

    let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
    match outcome {
        PolicyOutcome::BudgetExhausted { remaining_ids } => {
            // 30 J at 5 J each: six complete, four come back.
            assert_eq!(remaining_ids.len(), 4);
            for id in &remaining_ids {
                assert!(id.starts_with("job"));
            }
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_policy_completes_and_reports_duration() {
    let scheduler = WorkStealingScheduler::<PolicyTask>::new(2, 1);
    let tasks: Vec<PolicyTask> = (0..4)
        .map(|i| {
            PolicyTask::new(format!("sleepy{i}"), || {
                std::thread::sleep(Duration::from_millis(5));
            })
            .with_estimated_energy(0.5)
        })
        .collect();
    let state = PolicyState::new(10.0, Instant::now() + Duration::from_secs(60));

    let (elapsed, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
    assert_eq!(outcome, PolicyOutcome::Completed);
    // Two workers, four 5 ms tasks: at least two batches of wall time.
    assert!(elapsed >= Duration::from_millis(10));
}

#[test]
fn test_policy_measured_estimate_uses_fixed_watts() {
    let scheduler = WorkStealingScheduler::<PolicyTask>::new(1, 1);
    // 10 ms at 50 W is about 0.5 J; a 10 J budget comfortably covers five
    // tasks even with scheduling jitter.
    let tasks: Vec<PolicyTask> = (0..5)
        .map(|i| {
            PolicyTask::new(format!("t{i}"), || {
                std::thread::sleep(Duration::from_millis(10));
            })
        })
        .collect();
    let state = PolicyState::new(10.0, Instant::now() + Duration::from_secs(60));
    let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
    assert_eq!(outcome, PolicyOutcome::Completed);
}
