//! Planner output types and schedule inspection helpers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::graph::TaskGraph;
use crate::planner::resource::Resource;

/// One task pinned to a resource with concrete times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub resource_id: usize,
    /// Seconds from plan start.
    pub start: f64,
    pub finish: f64,
    pub depends_on: Vec<String>,
    /// Moment every predecessor output is present on `resource_id`.
    pub data_ready: f64,
}

/// A complete plan: placements plus the aggregates callers act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// In task-priority order, not execution order.
    pub tasks: Vec<ScheduledTask>,
    pub makespan: f64,
    /// Resource id → busy share of the makespan, percent.
    pub utilization: BTreeMap<usize, f64>,
    pub total_energy_joules: f64,
    pub critical_path: Vec<String>,
}

/// Wallclock span of a schedule: the latest finish time.
pub fn makespan(tasks: &[ScheduledTask]) -> f64 {
    tasks.iter().map(|t| t.finish).fold(0.0, f64::max)
}

/// Busy share of the makespan per resource, percent. Resources the schedule
/// never touches report 0.
pub fn resource_utilization(tasks: &[ScheduledTask], resources: &[Resource]) -> BTreeMap<usize, f64> {
    let span = makespan(tasks);
    let mut busy: BTreeMap<usize, f64> = resources.iter().map(|r| (r.id, 0.0)).collect();
    for task in tasks {
        *busy.entry(task.resource_id).or_insert(0.0) += task.finish - task.start;
    }
    if span > 0.0 {
        for value in busy.values_mut() {
            *value = *value / span * 100.0;
        }
    }
    busy
}

/// Check that a schedule respects its graph: every task present exactly once,
/// no start before data is ready, and no task starting before a predecessor
/// finishes.
pub fn validate_schedule(tasks: &[ScheduledTask], graph: &TaskGraph) -> bool {
    let by_id: HashMap<&str, &ScheduledTask> = tasks.iter().map(|t| (t.task_id.as_str(), t)).collect();
    if by_id.len() != tasks.len() || by_id.len() != graph.len() {
        return false;
    }

    for task in tasks {
        if graph.index_of(&task.task_id).is_none() {
            return false;
        }
        if task.start < task.data_ready || task.finish < task.start {
            return false;
        }
        for dep in &task.depends_on {
            match by_id.get(dep.as_str()) {
                Some(d) if d.finish <= task.start => {}
                _ => return false,
            }
        }
    }

    true
}

/// Extract the critical path of a produced schedule.
///
/// Each task is scored by the memoized sum of finish times over its successor
/// subtree; the walk starts at the heaviest entry task and keeps following
/// the heaviest successor.
pub fn critical_path(tasks: &[ScheduledTask], graph: &TaskGraph) -> Vec<String> {
    if tasks.is_empty() || graph.is_empty() {
        return Vec::new();
    }

    let finish: HashMap<&str, f64> = tasks.iter().map(|t| (t.task_id.as_str(), t.finish)).collect();
    let mut memo: Vec<Option<f64>> = vec![None; graph.len()];
    for i in 0..graph.len() {
        subtree_score(i, graph, &finish, &mut memo);
    }
    let score = |i: usize| memo[i].unwrap_or(0.0);

    let entries = graph.entry_tasks();
    let Some(&start) = entries.iter().max_by(|&&a, &&b| {
        score(a)
            .total_cmp(&score(b))
            .then_with(|| graph.task(b).id.cmp(&graph.task(a).id))
    }) else {
        return Vec::new();
    };

    let mut path = Vec::new();
    let mut current = start;
    loop {
        path.push(graph.task(current).id.clone());
        let next = graph.successors(current).iter().copied().max_by(|&a, &b| {
            score(a)
                .total_cmp(&score(b))
                .then_with(|| graph.task(b).id.cmp(&graph.task(a).id))
        });
        match next {
            Some(n) => current = n,
            None => break,
        }
    }
    path
}

fn subtree_score(
    v: usize,
    graph: &TaskGraph,
    finish: &HashMap<&str, f64>,
    memo: &mut Vec<Option<f64>>,
) -> f64 {
    if let Some(score) = memo[v] {
        return score;
    }
    let mut total = finish.get(graph.task(v).id.as_str()).copied().unwrap_or(0.0);
    for &s in graph.successors(v) {
        total += subtree_score(s, graph, finish, memo);
    }
    memo[v] = Some(total);
    total
}
