//! HEFT list scheduler for heterogeneous resources.
//!
//! Tasks are ordered by decreasing upward rank, then greedily placed on the
//! resource giving the earliest finish time, accounting for predecessor
//! output transfers and per-resource memory caps.

pub mod comm;
pub mod resource;
pub mod schedule;

pub use comm::{CommMatrix, Link};
pub use resource::{Resource, ResourceKind};
pub use schedule::{
    critical_path, makespan, resource_utilization, validate_schedule, ScheduledTask, ScheduleResult,
};

use std::collections::HashMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{ExecutionProfile, TaskGraph};

/// The planner. Holds only configuration; each [`plan`](HeftPlanner::plan)
/// call is a pure function of its inputs, so one planner may be shared across
/// threads working on disjoint task/resource sets.
#[derive(Debug, Clone, Default)]
pub struct HeftPlanner {
    config: Config,
}

struct Placement {
    resource_index: usize,
    start: f64,
    finish: f64,
    data_ready: f64,
}

impl HeftPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Plan `graph` onto `resources`.
    ///
    /// On success the resources' `available_at` / `committed_memory` reflect
    /// the produced schedule; on failure they are left untouched. Identical
    /// inputs produce identical schedules.
    pub fn plan(
        &self,
        graph: &TaskGraph,
        profiles: &HashMap<String, ExecutionProfile>,
        resources: &mut [Resource],
        comm: Option<&CommMatrix>,
    ) -> Result<ScheduleResult> {
        for (id, profile) in profiles {
            if *id != profile.task_id {
                return Err(Error::invalid_value(format!(
                    "profile for `{}` filed under key `{}`",
                    profile.task_id, id
                )));
            }
        }

        let synthesized;
        let comm = match comm {
            Some(matrix) => matrix,
            None => {
                synthesized = CommMatrix::default_for(
                    resources,
                    self.config.default_bandwidth_mbps,
                    self.config.default_latency_ms,
                );
                &synthesized
            }
        };

        // Plan against private copies so a failed plan mutates nothing.
        let mut pool: Vec<Resource> = resources.to_vec();
        for r in pool.iter_mut() {
            r.available_at = 0.0;
            r.committed_memory = 0;
        }

        let ranks = graph.upward_ranks(profiles, &pool, comm);
        let order = graph.schedule_order(&ranks);

        // Task index → (pool index, finish, output bytes) once placed.
        let mut placed: Vec<Option<(usize, f64, u64)>> = vec![None; graph.len()];
        let mut tasks = Vec::with_capacity(graph.len());

        for task_index in order {
            let spec = graph.task(task_index);
            let profile = profiles
                .get(&spec.id)
                .filter(|p| p.is_runnable())
                .ok_or_else(|| Error::NoFeasibleResource(spec.id.clone()))?;

            let placement = self.best_placement(task_index, profile, graph, &pool, comm, &placed)?;
            let placement = match placement {
                Some(p) => p,
                None => return Err(Error::NoFeasibleResource(spec.id.clone())),
            };

            let chosen = &mut pool[placement.resource_index];
            chosen.available_at = placement.finish;
            chosen.committed_memory += profile.memory_bytes;
            placed[task_index] = Some((placement.resource_index, placement.finish, profile.output_bytes));

            tasks.push(ScheduledTask {
                task_id: spec.id.clone(),
                resource_id: chosen.id,
                start: placement.start,
                finish: placement.finish,
                depends_on: spec.depends_on.clone(),
                data_ready: placement.data_ready,
            });
        }

        let makespan = schedule::makespan(&tasks);
        let utilization = schedule::resource_utilization(&tasks, &pool);
        let total_energy_joules = tasks
            .iter()
            .map(|t| {
                let watts = pool
                    .iter()
                    .find(|r| r.id == t.resource_id)
                    .map(|r| r.power_watts)
                    .unwrap_or(0.0);
                watts * (t.finish - t.start)
            })
            .sum();
        let critical_path = schedule::critical_path(&tasks, graph);

        // Commit the working state back to the caller's resources.
        for (caller, planned) in resources.iter_mut().zip(pool.into_iter()) {
            caller.available_at = planned.available_at;
            caller.committed_memory = planned.committed_memory;
        }

        Ok(ScheduleResult {
            tasks,
            makespan,
            utilization,
            total_energy_joules,
            critical_path,
        })
    }

    /// Earliest-finish placement for one task, or `None` when no resource
    /// kind matches. Kind-compatible resources without memory headroom turn
    /// into `MemoryExhausted`.
    fn best_placement(
        &self,
        task_index: usize,
        profile: &ExecutionProfile,
        graph: &TaskGraph,
        pool: &[Resource],
        comm: &CommMatrix,
        placed: &[Option<(usize, f64, u64)>],
    ) -> Result<Option<Placement>> {
        let mut best: Option<Placement> = None;
        let mut kind_feasible = false;

        for (resource_index, resource) in pool.iter().enumerate() {
            let Some(unit_time) = profile.time_for_kind(resource.kind) else {
                continue;
            };
            kind_feasible = true;
            if !resource.can_fit(profile.memory_bytes) {
                continue;
            }

            let mut data_ready = 0.0f64;
            for &dep in graph.predecessors(task_index) {
                // Schedule order never lists a task before its dependencies.
                let (dep_pool_index, dep_finish, dep_output) =
                    placed[dep].expect("predecessor scheduled before successor");
                let transfer = comm.transfer_time(dep_output, pool[dep_pool_index].id, resource.id);
                data_ready = data_ready.max(dep_finish + transfer);
            }

            let start = resource.available_at.max(data_ready);
            let finish = start + unit_time / resource.speed;

            let better = match &best {
                None => true,
                Some(current) => {
                    finish < current.finish
                        || (finish == current.finish
                            && resource.id < pool[current.resource_index].id)
                }
            };
            if better {
                best = Some(Placement {
                    resource_index,
                    start,
                    finish,
                    data_ready,
                });
            }
        }

        if best.is_none() && kind_feasible {
            return Err(Error::MemoryExhausted(graph.task(task_index).id.clone()));
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TaskSpec, WorkloadKind};

    fn profile_map(profiles: Vec<ExecutionProfile>) -> HashMap<String, ExecutionProfile> {
        profiles.into_iter().map(|p| (p.task_id.clone(), p)).collect()
    }

    fn single_task_setup() -> (TaskGraph, HashMap<String, ExecutionProfile>) {
        let graph = TaskGraph::new(vec![TaskSpec::new("solo", WorkloadKind::CpuBound)]).unwrap();
        let profiles = profile_map(vec![ExecutionProfile::new("solo")
            .with_time(ResourceKind::CpuCore, 4.0)
            .with_time(ResourceKind::GpuDevice, 9.0)]);
        (graph, profiles)
    }

    #[test]
    fn test_single_task_lands_on_fastest_resource() {
        let (graph, profiles) = single_task_setup();
        let mut resources = vec![
            Resource::new(1, ResourceKind::CpuCore, 1.0, 1 << 30, 50.0),
            Resource::new(2, ResourceKind::GpuDevice, 1.0, 1 << 30, 150.0),
        ];
        let result = HeftPlanner::new()
            .plan(&graph, &profiles, &mut resources, None)
            .unwrap();

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].resource_id, 1);
        assert_eq!(result.makespan, 4.0);
        assert_eq!(result.critical_path, vec!["solo"]);
        assert_eq!(resources[0].available_at, 4.0);
    }

    #[test]
    fn test_empty_resource_set_fails_on_first_task() {
        let (graph, profiles) = single_task_setup();
        let mut resources: Vec<Resource> = Vec::new();
        match HeftPlanner::new().plan(&graph, &profiles, &mut resources, None) {
            Err(Error::NoFeasibleResource(id)) => assert_eq!(id, "solo"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_speed_scales_execution_time() {
        let (graph, profiles) = single_task_setup();
        let mut resources = vec![
            Resource::new(1, ResourceKind::CpuCore, 1.0, 1 << 30, 50.0),
            Resource::new(2, ResourceKind::CpuCore, 4.0, 1 << 30, 90.0),
        ];
        let result = HeftPlanner::new()
            .plan(&graph, &profiles, &mut resources, None)
            .unwrap();
        assert_eq!(result.tasks[0].resource_id, 2);
        assert_eq!(result.makespan, 1.0);
    }

    #[test]
    fn test_memory_exhaustion_is_distinguished() {
        let graph = TaskGraph::new(vec![TaskSpec::new("big", WorkloadKind::MemoryBound)]).unwrap();
        let profiles = profile_map(vec![ExecutionProfile::new("big")
            .with_time(ResourceKind::CpuCore, 1.0)
            .with_memory(1 << 30)]);
        let mut resources = vec![Resource::new(1, ResourceKind::CpuCore, 1.0, 1 << 20, 50.0)];

        match HeftPlanner::new().plan(&graph, &profiles, &mut resources, None) {
            Err(Error::MemoryExhausted(id)) => assert_eq!(id, "big"),
            other => panic!("unexpected: {other:?}"),
        }
        // A failed plan leaves the caller's resources untouched.
        assert_eq!(resources[0].available_at, 0.0);
        assert_eq!(resources[0].committed_memory, 0);
    }

    #[test]
    fn test_missing_profile_means_no_feasible_resource() {
        let graph = TaskGraph::new(vec![TaskSpec::new("ghost", WorkloadKind::CpuBound)]).unwrap();
        let mut resources = vec![Resource::new(1, ResourceKind::CpuCore, 1.0, 1 << 30, 50.0)];
        assert!(matches!(
            HeftPlanner::new().plan(&graph, &HashMap::new(), &mut resources, None),
            Err(Error::NoFeasibleResource(id)) if id == "ghost"
        ));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let (graph, profiles) = single_task_setup();
        let make_resources = || {
            vec![
                Resource::new(1, ResourceKind::CpuCore, 1.0, 1 << 30, 50.0),
                Resource::new(2, ResourceKind::GpuDevice, 1.0, 1 << 30, 150.0),
            ]
        };
        let planner = HeftPlanner::new();
        let mut a = make_resources();
        let mut b = make_resources();
        let first = planner.plan(&graph, &profiles, &mut a, None).unwrap();
        let second = planner.plan(&graph, &profiles, &mut b, None).unwrap();
        assert_eq!(first.makespan, second.makespan);
        assert_eq!(
            first.tasks.iter().map(|t| t.resource_id).collect::<Vec<_>>(),
            second.tasks.iter().map(|t| t.resource_id).collect::<Vec<_>>()
        );
    }
}
