//! Task entities: what callers submit and how tasks behave per resource kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::planner::resource::ResourceKind;

/// Coarse workload classification used by frequency selection and placement
/// heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadKind {
    CpuBound,
    GpuBound,
    MemoryBound,
    IoBound,
}

/// One opaque unit of work in a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique within a submission.
    pub id: String,
    pub memory_bytes: u64,
    /// Dimensionless, nonnegative.
    pub compute_intensity: f64,
    pub workload: WorkloadKind,
    /// Ids of tasks whose outputs this task consumes.
    pub depends_on: Vec<String>,
    /// Seconds relative to submission time.
    pub deadline: Option<f64>,
    /// In `[0, 1]`.
    pub priority: f64,
}

impl TaskSpec {
    pub fn new<S: Into<String>>(id: S, workload: WorkloadKind) -> Self {
        Self {
            id: id.into(),
            memory_bytes: 0,
            compute_intensity: 1.0,
            workload,
            depends_on: Vec::new(),
            deadline: None,
            priority: 0.5,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    pub fn with_compute_intensity(mut self, intensity: f64) -> Self {
        self.compute_intensity = intensity.max(0.0);
        self
    }

    pub fn with_deadline(mut self, seconds: f64) -> Self {
        self.deadline = Some(seconds);
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority.clamp(0.0, 1.0);
        self
    }
}

/// Per-resource-kind execution behavior of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProfile {
    /// Must equal the id of the task this profile describes.
    pub task_id: String,
    /// Execution time at unit speed, seconds, per runnable resource kind.
    pub times: BTreeMap<ResourceKind, f64>,
    /// Bytes this task hands to each successor.
    pub output_bytes: u64,
    /// Bytes the task needs resident while running.
    pub memory_bytes: u64,
}

impl ExecutionProfile {
    pub fn new<S: Into<String>>(task_id: S) -> Self {
        Self {
            task_id: task_id.into(),
            times: BTreeMap::new(),
            output_bytes: 0,
            memory_bytes: 0,
        }
    }

    pub fn with_time(mut self, kind: ResourceKind, seconds: f64) -> Self {
        self.times.insert(kind, seconds);
        self
    }

    pub fn with_output_bytes(mut self, bytes: u64) -> Self {
        self.output_bytes = bytes;
        self
    }

    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    /// Execution time at unit speed on `kind`, if this task can run there.
    pub fn time_for_kind(&self, kind: ResourceKind) -> Option<f64> {
        self.times.get(&kind).copied()
    }

    /// A profile that supports no resource kind cannot run anywhere.
    pub fn is_runnable(&self) -> bool {
        !self.times.is_empty()
    }
}
