//! Platform sensor and actuator contracts.
//!
//! The scheduler core never shells out to the operating system. Everything it
//! knows about the machine arrives through [`PlatformSensors`], and the two
//! things it may ask the machine to do (pin a process, retune a core) go
//! through [`PlatformControl`]. Real backends (procfs, RAPL, NVML, SMC) live
//! outside this crate; [`SimulatedPlatform`] ships here for tests and dry runs.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where a power reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSource {
    Rapl,
    Nvml,
    Smc,
    Hwmon,
    Estimated,
}

/// Per-domain breakdown of a power reading, watts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDomains {
    pub cpu_package: Option<f64>,
    pub gpu: Option<f64>,
    pub memory: Option<f64>,
    pub uncore: Option<f64>,
}

/// A single instantaneous power measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    /// Seconds since an arbitrary epoch chosen by the sensor backend.
    pub timestamp: f64,
    pub total_watts: f64,
    pub domains: PowerDomains,
    pub source: PowerSource,
}

/// Snapshot of CPU/memory state as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Utilization per core, 0..=100.
    pub per_core_utilization: Vec<f64>,
    /// Aggregate CPU utilization, 0..=100.
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub memory_available_bytes: u64,
    /// 1/5/15 minute load averages.
    pub load_average: [f64; 3],
    /// Current frequency per core, MHz.
    pub core_frequencies_mhz: Vec<u32>,
    pub temperature_celsius: Option<f64>,
    pub platform: String,
    /// Seconds since the backend's epoch.
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other,
}

/// Snapshot of one GPU device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSnapshot {
    pub id: usize,
    pub vendor: GpuVendor,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub memory_free_bytes: u64,
    /// Utilization, 0..=100.
    pub utilization: f64,
    pub temperature_celsius: Option<f64>,
    pub power_watts: Option<f64>,
    pub clock_mhz: Option<u32>,
}

/// Read-only view of the machine. Implementations must be cheap enough to
/// poll from scheduling loops.
pub trait PlatformSensors: Send + Sync {
    fn read_system_metrics(&self) -> SystemSnapshot;

    fn read_gpus(&self) -> Vec<GpuSnapshot>;

    fn read_power(&self) -> PowerReading;

    /// Discrete operating points for a core, MHz. May be empty when the
    /// platform does not expose them.
    fn available_frequencies(&self, core: usize) -> Vec<u32>;
}

/// Actuation capabilities. Both calls are advisory; a backend that cannot
/// honor them returns [`Error::Unsupported`](crate::Error::Unsupported).
pub trait PlatformControl: Send + Sync {
    fn set_frequency(&self, core: usize, mhz: u32) -> Result<()>;

    fn set_affinity(&self, pid: u32, cores: &[usize]) -> Result<()>;
}

/// Deterministic in-memory platform used by tests and dry runs.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    pub cores: usize,
    pub frequencies_mhz: Vec<u32>,
    pub utilization: f64,
    pub watts: f64,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self {
            cores: 4,
            frequencies_mhz: vec![1200, 1800, 2400, 3000],
            utilization: 50.0,
            watts: 35.0,
        }
    }
}

impl SimulatedPlatform {
    pub fn new(cores: usize, frequencies_mhz: Vec<u32>) -> Self {
        Self {
            cores,
            frequencies_mhz,
            ..Self::default()
        }
    }

    /// A platform that reports no tunable operating points.
    pub fn without_frequencies(cores: usize) -> Self {
        Self::new(cores, Vec::new())
    }
}

impl PlatformSensors for SimulatedPlatform {
    fn read_system_metrics(&self) -> SystemSnapshot {
        let top = self.frequencies_mhz.iter().copied().max().unwrap_or(2000);
        SystemSnapshot {
            per_core_utilization: vec![self.utilization; self.cores],
            cpu_percent: self.utilization,
            memory_used_bytes: 8 << 30,
            memory_total_bytes: 16 << 30,
            memory_available_bytes: 8 << 30,
            load_average: [self.utilization / 100.0 * self.cores as f64; 3],
            core_frequencies_mhz: vec![top; self.cores],
            temperature_celsius: Some(55.0),
            platform: "simulated".to_string(),
            timestamp: 0.0,
        }
    }

    fn read_gpus(&self) -> Vec<GpuSnapshot> {
        Vec::new()
    }

    fn read_power(&self) -> PowerReading {
        PowerReading {
            timestamp: 0.0,
            total_watts: self.watts,
            domains: PowerDomains {
                cpu_package: Some(self.watts),
                ..PowerDomains::default()
            },
            source: PowerSource::Estimated,
        }
    }

    fn available_frequencies(&self, _core: usize) -> Vec<u32> {
        self.frequencies_mhz.clone()
    }
}

impl PlatformControl for SimulatedPlatform {
    fn set_frequency(&self, core: usize, mhz: u32) -> Result<()> {
        if core >= self.cores {
            return Err(crate::Error::invalid_value(format!("no such core {core}")));
        }
        if !self.frequencies_mhz.contains(&mhz) {
            return Err(crate::Error::invalid_value(format!(
                "{mhz} MHz is not an available operating point"
            )));
        }
        Ok(())
    }

    fn set_affinity(&self, _pid: u32, cores: &[usize]) -> Result<()> {
        if cores.iter().any(|&c| c >= self.cores) {
            return Err(crate::Error::invalid_value("core index out of range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_snapshot_shape() {
        let platform = SimulatedPlatform::default();
        let snapshot = platform.read_system_metrics();
        assert_eq!(snapshot.per_core_utilization.len(), platform.cores);
        assert_eq!(snapshot.core_frequencies_mhz.len(), platform.cores);
        assert!(snapshot.memory_available_bytes <= snapshot.memory_total_bytes);
    }

    #[test]
    fn test_simulated_control_validates_inputs() {
        let platform = SimulatedPlatform::default();
        assert!(platform.set_frequency(0, 2400).is_ok());
        assert!(platform.set_frequency(0, 1234).is_err());
        assert!(platform.set_frequency(99, 2400).is_err());
        assert!(platform.set_affinity(1, &[0, 1]).is_ok());
        assert!(platform.set_affinity(1, &[42]).is_err());
    }
}
