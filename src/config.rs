use crate::error::{Error, Result};

/// Default steal threshold: queues shorter than this are left alone.
pub const DEFAULT_STEAL_THRESHOLD: usize = 5;

/// Default cross-resource link bandwidth in MB/s.
pub const DEFAULT_BANDWIDTH_MBPS: f64 = 1000.0;

/// Default cross-resource link latency in milliseconds.
pub const DEFAULT_LATENCY_MS: f64 = 0.1;

/// Default static (leakage) power in watts.
pub const DEFAULT_STATIC_POWER_W: f64 = 5.0;

/// Default switched capacitance in farads.
pub const DEFAULT_CAPACITANCE_F: f64 = 1e-9;

/// Default flat power draw charged per executed policy task, in watts.
pub const DEFAULT_FIXED_CPU_WATTS: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count; `None` means one per logical CPU.
    pub num_workers: Option<usize>,
    /// Minimum victim queue length at which stealing is allowed.
    pub steal_threshold: usize,
    /// Bandwidth assumed for resource pairs missing from a comm matrix.
    pub default_bandwidth_mbps: f64,
    /// Latency assumed for resource pairs missing from a comm matrix.
    pub default_latency_ms: f64,
    /// Static power term of the CMOS estimator.
    pub static_power_watts: f64,
    /// Switched capacitance of the CMOS estimator.
    pub capacitance_farads: f64,
    /// Flat wattage used to convert measured durations into energy estimates.
    pub fixed_cpu_watts: f64,
    /// Re-enqueue budget multiplier for the policy scheduler.
    pub drain_attempt_factor: usize,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: None,
            steal_threshold: DEFAULT_STEAL_THRESHOLD,
            default_bandwidth_mbps: DEFAULT_BANDWIDTH_MBPS,
            default_latency_ms: DEFAULT_LATENCY_MS,
            static_power_watts: DEFAULT_STATIC_POWER_W,
            capacitance_farads: DEFAULT_CAPACITANCE_F,
            fixed_cpu_watts: DEFAULT_FIXED_CPU_WATTS,
            drain_attempt_factor: 2,
            thread_name_prefix: "ergon-worker".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_workers {
            if n == 0 {
                return Err(Error::config("num_workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_workers too large (max 1024)"));
            }
        }

        if self.default_bandwidth_mbps <= 0.0 {
            return Err(Error::config("default_bandwidth_mbps must be > 0"));
        }
        if self.default_latency_ms < 0.0 {
            return Err(Error::config("default_latency_ms must be >= 0"));
        }
        if self.static_power_watts < 0.0 || self.capacitance_farads < 0.0 {
            return Err(Error::config("power constants must be nonnegative"));
        }
        if self.fixed_cpu_watts <= 0.0 {
            return Err(Error::config("fixed_cpu_watts must be > 0"));
        }
        if self.drain_attempt_factor == 0 {
            return Err(Error::config("drain_attempt_factor must be > 0"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = Some(n);
        self
    }

    pub fn steal_threshold(mut self, threshold: usize) -> Self {
        self.config.steal_threshold = threshold;
        self
    }

    pub fn default_link(mut self, bandwidth_mbps: f64, latency_ms: f64) -> Self {
        self.config.default_bandwidth_mbps = bandwidth_mbps;
        self.config.default_latency_ms = latency_ms;
        self
    }

    pub fn static_power_watts(mut self, watts: f64) -> Self {
        self.config.static_power_watts = watts;
        self
    }

    pub fn capacitance_farads(mut self, farads: f64) -> Self {
        self.config.capacitance_farads = farads;
        self
    }

    pub fn fixed_cpu_watts(mut self, watts: f64) -> Self {
        self.config.fixed_cpu_watts = watts;
        self
    }

    pub fn drain_attempt_factor(mut self, factor: usize) -> Self {
        self.config.drain_attempt_factor = factor;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
