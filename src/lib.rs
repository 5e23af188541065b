//! ERGON - Energy-aware scheduling for heterogeneous compute
//!
//! A scheduling library that decides where and at what operating point each
//! unit of work should run, optimizing makespan, energy, or a blend of both
//! under dependency, memory, deadline and power-budget constraints.
//!
//! # Quick Start
//!
//! ```
//! use ergon::prelude::*;
//! use std::collections::HashMap;
//!
//! // Describe the work as a DAG...
//! let graph = TaskGraph::new(vec![
//!     TaskSpec::new("fetch", WorkloadKind::IoBound),
//!     TaskSpec::new("crunch", WorkloadKind::CpuBound).with_dependencies(["fetch"]),
//! ])
//! .unwrap();
//!
//! // ...say how each task behaves per resource kind...
//! let profiles: HashMap<String, ExecutionProfile> = [
//!     ExecutionProfile::new("fetch").with_time(ResourceKind::CpuCore, 1.0),
//!     ExecutionProfile::new("crunch").with_time(ResourceKind::CpuCore, 4.0),
//! ]
//! .into_iter()
//! .map(|p| (p.task_id.clone(), p))
//! .collect();
//!
//! // ...and plan it onto the machine.
//! let mut resources = vec![Resource::new(0, ResourceKind::CpuCore, 1.0, 8 << 30, 45.0)];
//! let schedule = HeftPlanner::new()
//!     .plan(&graph, &profiles, &mut resources, None)
//!     .unwrap();
//! assert_eq!(schedule.makespan, 5.0);
//! ```
//!
//! # Features
//!
//! - **HEFT planning**: upward-rank list scheduling over heterogeneous
//!   resources with communication and memory constraints
//! - **Work stealing**: per-worker deques with threshold-gated stealing for
//!   workloads with unknown costs
//! - **DVFS selection**: energy-optimal operating points under deadlines and
//!   power budgets
//! - **Policy draining**: energy-budgeted execution that defers work instead
//!   of dropping it
//! - **Telemetry**: scheduler event counters and latency statistics

#![warn(missing_debug_implementations)]

pub mod balance;
pub mod config;
pub mod error;
pub mod graph;
pub mod planner;
pub mod platform;
pub mod power;
pub mod prelude;
pub mod runtime;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use graph::{ExecutionProfile, TaskGraph, TaskSpec, WorkloadKind};
pub use planner::{HeftPlanner, Resource, ResourceKind, ScheduleResult};
pub use runtime::{PolicyOutcome, PolicyState, PolicyTask, WorkStealingScheduler};
