//! Compute resource model.

use serde::{Deserialize, Serialize};

/// The closed set of resource kinds a task profile can dispatch on.
/// Exhaustive matches keep additions honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    CpuCore,
    GpuDevice,
    MemoryNode,
    Accelerator,
}

/// One schedulable resource: a core, a device, a memory node or an
/// accelerator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: usize,
    pub kind: ResourceKind,
    /// Relative compute speed; profile times are divided by this.
    pub speed: f64,
    /// GB/s, advisory.
    pub memory_bandwidth: f64,
    /// Moment this resource frees up, seconds from plan start. Monotonically
    /// nondecreasing while a plan commits tasks.
    pub available_at: f64,
    pub max_memory: u64,
    pub committed_memory: u64,
    /// Draw at the nominal operating point, watts.
    pub power_watts: f64,
}

impl Resource {
    pub fn new(id: usize, kind: ResourceKind, speed: f64, max_memory: u64, power_watts: f64) -> Self {
        Self {
            id,
            kind,
            speed,
            memory_bandwidth: 0.0,
            available_at: 0.0,
            max_memory,
            committed_memory: 0,
            power_watts,
        }
    }

    pub fn with_memory_bandwidth(mut self, gbps: f64) -> Self {
        self.memory_bandwidth = gbps;
        self
    }

    /// Bytes still available for new commitments.
    pub fn free_memory(&self) -> u64 {
        self.max_memory.saturating_sub(self.committed_memory)
    }

    /// Whether `bytes` more can be committed without breaching the cap.
    pub fn can_fit(&self, bytes: u64) -> bool {
        bytes <= self.free_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_accounting() {
        let mut resource = Resource::new(1, ResourceKind::CpuCore, 1.0, 100, 50.0);
        assert!(resource.can_fit(100));
        resource.committed_memory = 60;
        assert_eq!(resource.free_memory(), 40);
        assert!(resource.can_fit(40));
        assert!(!resource.can_fit(41));
    }
}
