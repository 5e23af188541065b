//! Reduction of raw timing samples into summary statistics.

/// Summary of a sample vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

/// Reduce `samples` to mean/std/p95/p99/max. The input is left untouched;
/// an empty input has no statistics.
pub fn summarize(samples: &[f64]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|&s| (s - mean) * (s - mean)).sum::<f64>() / n;

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(Summary {
        mean,
        std_dev: variance.sqrt(),
        p95: quantile(&sorted, 0.95),
        p99: quantile(&sorted, 0.99),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear interpolation between order statistics. `sorted` must be ascending
/// and nonempty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let t = position - lower as f64;
    sorted[lower] + t * (sorted[upper] - sorted[lower])
}
