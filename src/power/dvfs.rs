//! Frequency selection under power budgets and deadlines.

use crate::platform::PlatformSensors;
use crate::power::estimator::PowerEstimator;

/// Fallback operating points when the platform reports none, MHz.
pub const DEFAULT_FREQUENCIES_MHZ: [u32; 8] = [800, 1200, 1600, 2000, 2400, 2800, 3200, 3600];

/// Supply voltage slope, volts per GHz. DVFS platforms raise voltage roughly
/// linearly with frequency, which is what makes dynamic power cubic in `f`.
const VOLTS_PER_GHZ: f64 = 1.0;

/// Normalized load signals driving workload-aware frequency selection.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadSignals {
    /// CPU utilization, `[0, 1]`.
    pub cpu_utilization: f64,
    /// Memory bandwidth pressure, `[0, 1]`.
    pub memory_pressure: f64,
}

/// Operating points for `core`, falling back to [`DEFAULT_FREQUENCIES_MHZ`]
/// when the platform exposes none.
pub fn available_frequencies(sensors: &dyn PlatformSensors, core: usize) -> Vec<u32> {
    let reported = sensors.available_frequencies(core);
    if reported.is_empty() {
        DEFAULT_FREQUENCIES_MHZ.to_vec()
    } else {
        reported
    }
}

fn power_at(estimator: &PowerEstimator, mhz: u32, utilization: f64) -> f64 {
    let hz = mhz as f64 * 1e6;
    let volts = mhz as f64 / 1000.0 * VOLTS_PER_GHZ;
    estimator.power(hz, volts, utilization)
}

/// Pick the frequency suiting the current workload shape under a power budget.
///
/// CPU-bound load targets 90% of `f_max`, memory-bound 60%, idle 40%,
/// everything else 70%; the closest available frequency whose estimated power
/// fits `budget_watts` wins. When nothing fits, the minimum frequency is
/// returned.
pub fn optimal_for_workload(
    estimator: &PowerEstimator,
    signals: WorkloadSignals,
    budget_watts: f64,
    frequencies_mhz: &[u32],
) -> u32 {
    let default;
    let frequencies = if frequencies_mhz.is_empty() {
        default = DEFAULT_FREQUENCIES_MHZ;
        &default[..]
    } else {
        frequencies_mhz
    };

    let f_max = frequencies.iter().copied().max().unwrap();
    let f_min = frequencies.iter().copied().min().unwrap();

    let u = signals.cpu_utilization.clamp(0.0, 1.0);
    let m = signals.memory_pressure.clamp(0.0, 1.0);
    let fraction = if u > 0.8 && m < 0.5 {
        0.9
    } else if m > 0.7 {
        0.6
    } else if u < 0.3 {
        0.4
    } else {
        0.7
    };
    let target = fraction * f_max as f64;

    frequencies
        .iter()
        .copied()
        .filter(|&f| power_at(estimator, f, u) <= budget_watts)
        .min_by(|&a, &b| {
            (a as f64 - target)
                .abs()
                .total_cmp(&(b as f64 - target).abs())
                .then(a.cmp(&b))
        })
        .unwrap_or(f_min)
}

/// Pick the frequency minimizing energy for a CPU-bound workload that takes
/// `base_time_s` seconds at `f_max`, subject to an optional deadline.
///
/// Execution time scales as `t(f) = t₀ · f_max / f`; candidates missing the
/// deadline are skipped and ties prefer the higher frequency. When no
/// frequency meets the deadline this fails open to `f_max`.
pub fn energy_optimal_frequency(
    estimator: &PowerEstimator,
    frequencies_mhz: &[u32],
    base_time_s: f64,
    deadline_s: Option<f64>,
) -> u32 {
    let default;
    let frequencies = if frequencies_mhz.is_empty() {
        default = DEFAULT_FREQUENCIES_MHZ;
        &default[..]
    } else {
        frequencies_mhz
    };

    let f_max = frequencies.iter().copied().max().unwrap();

    let mut best: Option<(u32, f64)> = None;
    for &f in frequencies {
        if f == 0 {
            continue;
        }
        let time = base_time_s * f_max as f64 / f as f64;
        if let Some(deadline) = deadline_s {
            if time > deadline {
                continue;
            }
        }
        let energy = power_at(estimator, f, 1.0) * time;
        best = match best {
            None => Some((f, energy)),
            Some((best_f, best_e)) => match energy.total_cmp(&best_e) {
                std::cmp::Ordering::Less => Some((f, energy)),
                std::cmp::Ordering::Equal if f > best_f => Some((f, energy)),
                _ => Some((best_f, best_e)),
            },
        };
    }

    best.map(|(f, _)| f).unwrap_or(f_max)
}
