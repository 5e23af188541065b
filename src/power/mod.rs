//! Power modeling and frequency selection.
//!
//! [`estimator`] maps operating points to watts and integrates watts into
//! joules; [`dvfs`] picks operating points under power budgets and deadlines.

pub mod dvfs;
pub mod estimator;

pub use dvfs::{
    available_frequencies, energy_optimal_frequency, optimal_for_workload, WorkloadSignals,
    DEFAULT_FREQUENCIES_MHZ,
};
pub use estimator::{energy_from_readings, EnergyMeter, MeasuredPowerModel, PowerEstimator};
