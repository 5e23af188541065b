//! Inter-resource communication cost model.

use std::collections::HashMap;

use crate::config::{DEFAULT_BANDWIDTH_MBPS, DEFAULT_LATENCY_MS};
use crate::planner::resource::Resource;

/// One directed link between a resource pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub bandwidth_mbps: f64,
    pub latency_ms: f64,
}

impl Link {
    pub fn new(bandwidth_mbps: f64, latency_ms: f64) -> Self {
        Self {
            bandwidth_mbps,
            latency_ms,
        }
    }

    /// Seconds to move `bytes` across this link.
    fn transfer_time(&self, bytes: u64) -> f64 {
        if self.bandwidth_mbps.is_infinite() {
            return 0.0;
        }
        self.latency_ms / 1e3 + bytes as f64 / (self.bandwidth_mbps * 1e6)
    }
}

/// Sparse `(src, dst) → link` table. Pairs that were never described fall
/// back to the configured default link; a resource talking to itself is free.
#[derive(Debug, Clone)]
pub struct CommMatrix {
    links: HashMap<(usize, usize), Link>,
    default_link: Link,
}

impl Default for CommMatrix {
    fn default() -> Self {
        Self::new(DEFAULT_BANDWIDTH_MBPS, DEFAULT_LATENCY_MS)
    }
}

impl CommMatrix {
    pub fn new(default_bandwidth_mbps: f64, default_latency_ms: f64) -> Self {
        Self {
            links: HashMap::new(),
            default_link: Link::new(default_bandwidth_mbps, default_latency_ms),
        }
    }

    /// A matrix covering `resources`: infinite-bandwidth zero-latency
    /// self-edges, default links everywhere else.
    pub fn default_for(resources: &[Resource], bandwidth_mbps: f64, latency_ms: f64) -> Self {
        let mut matrix = Self::new(bandwidth_mbps, latency_ms);
        for src in resources {
            for dst in resources {
                let link = if src.id == dst.id {
                    Link::new(f64::INFINITY, 0.0)
                } else {
                    matrix.default_link
                };
                matrix.set_link(src.id, dst.id, link);
            }
        }
        matrix
    }

    pub fn set_link(&mut self, src: usize, dst: usize, link: Link) {
        self.links.insert((src, dst), link);
    }

    pub fn link(&self, src: usize, dst: usize) -> Link {
        self.links.get(&(src, dst)).copied().unwrap_or(self.default_link)
    }

    /// Seconds to move `bytes` from `src` to `dst`. Zero when they are the
    /// same resource.
    pub fn transfer_time(&self, bytes: u64, src: usize, dst: usize) -> f64 {
        if src == dst {
            return 0.0;
        }
        self.link(src, dst).transfer_time(bytes)
    }
}
