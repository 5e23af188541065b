//! Watts from operating points, joules from watts.

use parking_lot::Mutex;

use crate::config::{DEFAULT_CAPACITANCE_F, DEFAULT_STATIC_POWER_W};
use crate::error::{Error, Result};
use crate::platform::PowerReading;

/// CMOS-style power estimator: `P = P_static + C·V²·f·α`.
///
/// Total input clamping keeps the output finite and nonnegative for any
/// finite input, and monotone in frequency and utilization.
#[derive(Debug, Clone, Copy)]
pub struct PowerEstimator {
    /// Leakage floor, watts.
    pub static_power: f64,
    /// Switched capacitance, farads.
    pub capacitance: f64,
}

impl Default for PowerEstimator {
    fn default() -> Self {
        Self {
            static_power: DEFAULT_STATIC_POWER_W,
            capacitance: DEFAULT_CAPACITANCE_F,
        }
    }
}

impl PowerEstimator {
    pub fn new(static_power: f64, capacitance: f64) -> Self {
        Self {
            static_power: static_power.max(0.0),
            capacitance: capacitance.max(0.0),
        }
    }

    /// Estimated total power draw in watts.
    ///
    /// `frequency_hz` in Hz, `voltage` in volts, `utilization` in `[0, 1]`
    /// (values outside are clamped).
    pub fn power(&self, frequency_hz: f64, voltage: f64, utilization: f64) -> f64 {
        let f = frequency_hz.max(0.0);
        let v = voltage.max(0.0);
        let alpha = utilization.clamp(0.0, 1.0);
        self.static_power + self.capacitance * v * v * f * alpha
    }
}

/// Area of one trapezoidal slice of a power trace.
fn trapezoid(dt_s: f64, watts_start: f64, watts_end: f64) -> f64 {
    dt_s * (watts_start + watts_end) / 2.0
}

/// Trapezoidal integration of an ordered power trace into joules.
///
/// Fewer than two samples carry no interval, so they integrate to zero.
pub fn energy_from_readings(readings: &[PowerReading]) -> f64 {
    readings
        .windows(2)
        .map(|pair| {
            trapezoid(
                pair[1].timestamp - pair[0].timestamp,
                pair[0].total_watts,
                pair[1].total_watts,
            )
        })
        .sum()
}

/// Streaming counterpart of [`energy_from_readings`].
///
/// Feeding it a trace one reading at a time yields the same joule total as
/// integrating the whole trace at once; known energy amounts (for example a
/// policy charge for a completed task) can be added directly. The first
/// reading only anchors the trace, integration starts with the second.
#[derive(Debug, Default)]
pub struct EnergyMeter {
    inner: Mutex<MeterInner>,
}

#[derive(Debug, Default)]
struct MeterInner {
    /// `(timestamp, watts)` of the previous reading, once one arrived.
    anchor: Option<(f64, f64)>,
    joules: f64,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one reading into the running total.
    pub fn observe(&self, reading: &PowerReading) {
        let mut inner = self.inner.lock();
        if let Some((t0, w0)) = inner.anchor {
            inner.joules += trapezoid(reading.timestamp - t0, w0, reading.total_watts);
        }
        inner.anchor = Some((reading.timestamp, reading.total_watts));
    }

    /// Add a known amount of energy directly.
    pub fn charge(&self, joules: f64) {
        self.inner.lock().joules += joules;
    }

    pub fn total_joules(&self) -> f64 {
        self.inner.lock().joules
    }

    /// Drop the total and the trace anchor.
    pub fn reset(&self) {
        *self.inner.lock() = MeterInner::default();
    }
}

/// Piecewise-linear `frequency → watts` model fitted to measured samples.
///
/// Queries outside the measured range clamp to the nearest endpoint.
#[derive(Debug, Clone)]
pub struct MeasuredPowerModel {
    /// `(frequency, watts)` pairs sorted by frequency ascending.
    points: Vec<(f64, f64)>,
}

impl MeasuredPowerModel {
    pub fn fit(frequencies: &[f64], watts: &[f64]) -> Result<Self> {
        if frequencies.len() != watts.len() {
            return Err(Error::invalid_value(format!(
                "{} frequencies paired with {} watt samples",
                frequencies.len(),
                watts.len()
            )));
        }
        if frequencies.len() < 2 {
            return Err(Error::InsufficientData {
                needed: 2,
                got: frequencies.len(),
            });
        }

        let mut points: Vec<(f64, f64)> = frequencies
            .iter()
            .copied()
            .zip(watts.iter().copied())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self { points })
    }

    /// Interpolated power draw at `frequency`.
    pub fn watts_at(&self, frequency: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if frequency <= first.0 {
            return first.1;
        }
        if frequency >= last.0 {
            return last.1;
        }

        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if frequency <= x1 {
                if x1 == x0 {
                    return y1;
                }
                let t = (frequency - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }

        last.1
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}
