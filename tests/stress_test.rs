//! Stress tests for the ERGON runtime

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ergon::prelude::*;

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_steal_storm() {
    // One hot queue, many thieves, repeated rounds.
    for round in 0..20 {
        let scheduler = Arc::new(WorkStealingScheduler::new(8, 1));
        let total = 10_000;
        for i in 0..total {
            scheduler.push(0, (round, i));
        }

        let collected = Arc::new(Mutex::new(HashSet::new()));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let scheduler = scheduler.clone();
            let collected = collected.clone();
            handles.push(std::thread::spawn(move || loop {
                match scheduler.pop(worker) {
                    Some(item) => {
                        assert!(collected.lock().insert(item), "duplicate delivery");
                    }
                    None => break,
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collected.lock().len(), total);
    }
}

#[test]
#[ignore]
fn stress_test_interleaved_push_and_drain() {
    let scheduler = Arc::new(WorkStealingScheduler::new(4, 2));
    let total = 50_000usize;
    let collected = Arc::new(Mutex::new(Vec::new()));

    std::thread::scope(|scope| {
        // Producer keeps feeding worker 0 while the others drain.
        let producer_scheduler = scheduler.clone();
        scope.spawn(move || {
            for i in 0..total {
                producer_scheduler.push(0, i);
            }
        });

        for worker in 1..4 {
            let scheduler = scheduler.clone();
            let collected = collected.clone();
            scope.spawn(move || {
                let mut idle = 0;
                while idle < 1000 {
                    match scheduler.pop(worker) {
                        Some(item) => {
                            idle = 0;
                            collected.lock().push(item);
                        }
                        None => {
                            idle += 1;
                            std::thread::yield_now();
                        }
                    }
                }
            });
        }
    });

    // Whatever the thieves missed is still sitting in queue 0.
    let mut remaining = 0;
    while scheduler.pop(0).is_some() {
        remaining += 1;
    }
    let collected = collected.lock();
    let unique: HashSet<usize> = collected.iter().copied().collect();
    assert_eq!(unique.len(), collected.len());
    assert_eq!(collected.len() + remaining, total);
}

#[test]
#[ignore]
fn stress_test_policy_churn() {
    for _ in 0..10 {
        let scheduler = WorkStealingScheduler::<PolicyTask>::new(4, 1);
        let tasks: Vec<PolicyTask> = (0..200)
            .map(|i| PolicyTask::new(format!("t{i}"), || {}).with_estimated_energy(1.0))
            .collect();
        let state = PolicyState::new(150.0, Instant::now() + Duration::from_secs(60));
        let (_, outcome) = run_policy(&scheduler, tasks, state, &Config::default()).unwrap();
        match outcome {
            PolicyOutcome::BudgetExhausted { remaining_ids } => {
                assert_eq!(remaining_ids.len(), 50);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
