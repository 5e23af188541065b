//! Typed task DAG: validation, topological order and upward-rank priorities.
//!
//! Tasks are stored arena-style (a vector plus an id index) with integer
//! predecessor/successor lists. Cycles and dangling dependencies are rejected
//! during construction, so every graph that exists is schedulable in
//! principle.

pub mod task;

pub use task::{ExecutionProfile, TaskSpec, WorkloadKind};

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::planner::comm::CommMatrix;
use crate::planner::resource::Resource;

/// A validated DAG of [`TaskSpec`]s.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<TaskSpec>,
    index: HashMap<String, usize>,
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    topo: Vec<usize>,
}

impl TaskGraph {
    /// Build a graph from a task list, rejecting duplicate ids, unknown
    /// dependencies and cycles (Kahn sweep).
    pub fn new(tasks: Vec<TaskSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), i).is_some() {
                return Err(Error::DuplicateTask(task.id.clone()));
            }
        }

        let mut preds = vec![Vec::new(); tasks.len()];
        let mut succs = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dep in &task.depends_on {
                let &d = index.get(dep).ok_or_else(|| Error::UnknownDependency {
                    task: task.id.clone(),
                    dependency: dep.clone(),
                })?;
                preds[i].push(d);
                succs[d].push(i);
            }
        }

        let topo = match kahn_order(&preds, &succs) {
            Ok(order) => order,
            Err(stuck) => {
                let mut ids: Vec<String> = stuck.into_iter().map(|i| tasks[i].id.clone()).collect();
                ids.sort();
                return Err(Error::Cycle(ids));
            }
        };

        Ok(Self {
            tasks,
            index,
            preds,
            succs,
            topo,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> &TaskSpec {
        &self.tasks[index]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.preds[index]
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.succs[index]
    }

    /// Tasks with no predecessors, in id-ascending order.
    pub fn entry_tasks(&self) -> Vec<usize> {
        let mut entries: Vec<usize> = (0..self.tasks.len())
            .filter(|&i| self.preds[i].is_empty())
            .collect();
        entries.sort_by(|&a, &b| self.tasks[a].id.cmp(&self.tasks[b].id));
        entries
    }

    /// A valid execution order (dependencies first).
    pub fn topological_order(&self) -> &[usize] {
        &self.topo
    }

    /// HEFT upward ranks: expected remaining time from each task to any DAG
    /// exit, combining average execution time over feasible resources and
    /// average output-transfer cost over distinct resource pairs.
    pub fn upward_ranks(
        &self,
        profiles: &HashMap<String, ExecutionProfile>,
        resources: &[Resource],
        comm: &CommMatrix,
    ) -> Vec<f64> {
        let exec_avg: Vec<f64> = self
            .tasks
            .iter()
            .map(|task| average_exec_time(profiles.get(&task.id), resources))
            .collect();
        let comm_avg: Vec<f64> = self
            .tasks
            .iter()
            .map(|task| {
                profiles
                    .get(&task.id)
                    .map(|p| average_transfer_time(p.output_bytes, resources, comm))
                    .unwrap_or(0.0)
            })
            .collect();

        let mut ranks = vec![0.0; self.tasks.len()];
        let mut visited = vec![false; self.tasks.len()];
        for i in 0..self.tasks.len() {
            self.rank_dfs(i, &exec_avg, &comm_avg, &mut ranks, &mut visited);
        }
        ranks
    }

    fn rank_dfs(
        &self,
        v: usize,
        exec_avg: &[f64],
        comm_avg: &[f64],
        ranks: &mut [f64],
        visited: &mut [bool],
    ) {
        if visited[v] {
            return;
        }
        visited[v] = true;

        let mut best = 0.0f64;
        for &s in &self.succs[v] {
            self.rank_dfs(s, exec_avg, comm_avg, ranks, visited);
            best = best.max(comm_avg[v] + ranks[s]);
        }
        ranks[v] = exec_avg[v] + best;
    }

    /// Scheduling order: descending rank, ties broken by ascending task id so
    /// planning is deterministic.
    pub fn priority_order(&self, ranks: &[f64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by(|&a, &b| {
            ranks[b]
                .total_cmp(&ranks[a])
                .then_with(|| self.tasks[a].id.cmp(&self.tasks[b].id))
        });
        order
    }

    /// [`priority_order`](Self::priority_order) refined so no task ever
    /// precedes one of its dependencies. Ranks of zero-cost tasks can tie
    /// across an edge; the refinement keeps such orders schedulable without
    /// disturbing the rank order anywhere else.
    pub fn schedule_order(&self, ranks: &[f64]) -> Vec<usize> {
        let n = self.tasks.len();
        let priority = self.priority_order(ranks);
        let mut position = vec![0usize; n];
        for (p, &i) in priority.iter().enumerate() {
            position[i] = p;
        }

        let mut in_degree: Vec<usize> = self.preds.iter().map(Vec::len).collect();
        let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<(usize, usize)>> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| std::cmp::Reverse((position[i], i)))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(std::cmp::Reverse((_, v))) = ready.pop() {
            order.push(v);
            for &s in &self.succs[v] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    ready.push(std::cmp::Reverse((position[s], s)));
                }
            }
        }
        order
    }
}

/// Mean unit-speed-adjusted execution time over the resources that can run
/// the profile. Zero when nothing can.
fn average_exec_time(profile: Option<&ExecutionProfile>, resources: &[Resource]) -> f64 {
    let Some(profile) = profile else { return 0.0 };
    let mut total = 0.0;
    let mut count = 0usize;
    for resource in resources {
        if let Some(time) = profile.time_for_kind(resource.kind) {
            total += time / resource.speed;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Mean transfer time of `bytes` over all distinct resource pairs.
fn average_transfer_time(bytes: u64, resources: &[Resource], comm: &CommMatrix) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for src in resources {
        for dst in resources {
            if src.id == dst.id {
                continue;
            }
            total += comm.transfer_time(bytes, src.id, dst.id);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Kahn's algorithm. `Err(stuck)` lists the vertices left with nonzero
/// in-degree, i.e. the ones on or downstream of a cycle.
fn kahn_order(preds: &[Vec<usize>], succs: &[Vec<usize>]) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let n = preds.len();
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    let mut head = 0;
    while head < queue.len() {
        let v = queue[head];
        head += 1;
        order.push(v);
        for &s in &succs[v] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                queue.push(s);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        let stuck: Vec<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
        Err(stuck)
    }
}
