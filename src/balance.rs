//! Static load-balancing strategies.
//!
//! Pure distribution functions from `(items, resources)` to per-resource
//! item lists. The runtime uses them to prime worker queues; callers can use
//! them directly to pre-partition work before planning.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Which distributor a scheduler primes its queues with.
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceStrategy {
    RoundRobin,
    LeastLoaded,
    /// Two uniform samples per item, the less-loaded choice wins. Seeded so
    /// a given scheduler distributes reproducibly.
    PowerOfTwoChoices { seed: u64 },
    /// Per-resource share weights, matched positionally to the resource list.
    Weighted(Vec<f64>),
}

impl Default for BalanceStrategy {
    fn default() -> Self {
        BalanceStrategy::RoundRobin
    }
}

/// Dispatch to the strategy's distributor with unit item weights.
pub fn apply<T>(
    strategy: &BalanceStrategy,
    items: Vec<T>,
    resource_ids: &[usize],
) -> BTreeMap<usize, Vec<T>> {
    match strategy {
        BalanceStrategy::RoundRobin => round_robin(items, resource_ids),
        BalanceStrategy::LeastLoaded => least_loaded(items, resource_ids, |_| 1.0),
        BalanceStrategy::PowerOfTwoChoices { seed } => {
            let mut rng = Pcg64Mcg::seed_from_u64(*seed);
            power_of_two_choices(items, resource_ids, &mut rng)
        }
        BalanceStrategy::Weighted(weights) => {
            let paired: Vec<(usize, f64)> = resource_ids
                .iter()
                .copied()
                .zip(weights.iter().copied())
                .collect();
            weighted(items, &paired)
        }
    }
}

/// Item `k` goes to resource `k mod n`. Order-preserving within a resource.
pub fn round_robin<T>(items: Vec<T>, resource_ids: &[usize]) -> BTreeMap<usize, Vec<T>> {
    let mut assignment: BTreeMap<usize, Vec<T>> =
        resource_ids.iter().map(|&id| (id, Vec::new())).collect();
    if resource_ids.is_empty() {
        return assignment;
    }
    for (k, item) in items.into_iter().enumerate() {
        assignment
            .get_mut(&resource_ids[k % resource_ids.len()])
            .unwrap()
            .push(item);
    }
    assignment
}

/// Heaviest-first greedy: items sorted by weight descending (stable), each
/// assigned to the currently least-loaded resource, ties to the smallest id.
pub fn least_loaded<T, F>(items: Vec<T>, resource_ids: &[usize], weight: F) -> BTreeMap<usize, Vec<T>>
where
    F: Fn(&T) -> f64,
{
    let mut assignment: BTreeMap<usize, Vec<T>> =
        resource_ids.iter().map(|&id| (id, Vec::new())).collect();
    if resource_ids.is_empty() {
        return assignment;
    }

    let mut weighted_items: Vec<(f64, T)> = items.into_iter().map(|item| (weight(&item), item)).collect();
    weighted_items.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut loads: BTreeMap<usize, f64> = resource_ids.iter().map(|&id| (id, 0.0)).collect();
    for (w, item) in weighted_items {
        // BTreeMap iterates ids ascending, so a strict comparison keeps the
        // smallest id among equally loaded resources.
        let target = loads
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&id, _)| id)
            .unwrap();
        *loads.get_mut(&target).unwrap() += w;
        assignment.get_mut(&target).unwrap().push(item);
    }
    assignment
}

/// Two-choice sampling: each item draws two resources with replacement and
/// joins the one with the smaller current load.
pub fn power_of_two_choices<T, R: Rng>(
    items: Vec<T>,
    resource_ids: &[usize],
    rng: &mut R,
) -> BTreeMap<usize, Vec<T>> {
    let mut assignment: BTreeMap<usize, Vec<T>> =
        resource_ids.iter().map(|&id| (id, Vec::new())).collect();
    if resource_ids.is_empty() {
        return assignment;
    }

    let mut counts: BTreeMap<usize, usize> = resource_ids.iter().map(|&id| (id, 0)).collect();
    for item in items {
        let first = resource_ids[rng.gen_range(0..resource_ids.len())];
        let second = resource_ids[rng.gen_range(0..resource_ids.len())];
        let target = if counts[&second] < counts[&first] {
            second
        } else {
            first
        };
        *counts.get_mut(&target).unwrap() += 1;
        assignment.get_mut(&target).unwrap().push(item);
    }
    assignment
}

/// Proportional split: resource `r` targets `round(n·w_r/Σw)` items, filled
/// in input order; whatever the rounding leaves over is spread round-robin.
pub fn weighted<T>(items: Vec<T>, weights: &[(usize, f64)]) -> BTreeMap<usize, Vec<T>> {
    let mut assignment: BTreeMap<usize, Vec<T>> =
        weights.iter().map(|&(id, _)| (id, Vec::new())).collect();
    if weights.is_empty() {
        return assignment;
    }

    let total: f64 = weights.iter().map(|&(_, w)| w.max(0.0)).sum();
    let n = items.len();
    let mut iter = items.into_iter();

    if total > 0.0 {
        for &(id, w) in weights {
            let target = (n as f64 * w.max(0.0) / total).round() as usize;
            for _ in 0..target {
                match iter.next() {
                    Some(item) => assignment.get_mut(&id).unwrap().push(item),
                    None => return assignment,
                }
            }
        }
    }

    // Rounding shortfall: hand out the rest one per resource.
    for (k, item) in iter.enumerate() {
        let id = weights[k % weights.len()].0;
        assignment.get_mut(&id).unwrap().push(item);
    }
    assignment
}
