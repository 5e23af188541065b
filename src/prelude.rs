//! Convenient re-exports for common ERGON types and traits.
//!
//! This module provides a single import for most common use cases:
//! ```
//! use ergon::prelude::*;
//! ```

pub use crate::balance::BalanceStrategy;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::graph::{ExecutionProfile, TaskGraph, TaskSpec, WorkloadKind};
pub use crate::planner::{
    critical_path, makespan, resource_utilization, validate_schedule, CommMatrix, HeftPlanner,
    Link, Resource, ResourceKind, ScheduleResult, ScheduledTask,
};
pub use crate::platform::{PlatformControl, PlatformSensors, SimulatedPlatform};
pub use crate::power::{EnergyMeter, PowerEstimator};
pub use crate::runtime::{
    run_policy, PolicyOutcome, PolicyState, PolicyTask, WorkStealingScheduler,
};
pub use crate::telemetry::{summarize, Metrics, Summary};
