//! Determinism testing utilities.
//!
//! Planner output must be a pure function of the snapshot and options.
//! Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized per
//!   process. Every table is walked in sorted id order.
//!
//! - **Float tie-breaks**: near-equal scores are compared with a quantized
//!   tolerance so tiny rounding noise cannot flip an ordering.
//!
//! - **Mutation during planning**: planners read a snapshot and never
//!   write it; [`verify_purity`] checks this by hashing before and after.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use nebula_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Steps performed per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (1 when deterministic).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Output is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a setup/step/hash cycle several times and compare the hashes.
///
/// # Arguments
///
/// * `runs` - Number of independent runs
/// * `ticks` - Steps per run
/// * `setup` - Builds the initial state
/// * `step` - Advances the state once
/// * `hash` - Hashes the final state
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Hash of any serializable value, through its bincode encoding.
///
/// Floats are hashed by bit pattern, so `0.1 + 0.2` and `0.3` differ.
#[must_use]
pub fn output_hash<T: Serialize>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    match bincode::serialize(value) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(e) => e.to_string().hash(&mut hasher),
    }
    hasher.finish()
}

/// Run a planner on freshly built snapshots and compare the outputs.
///
/// Each run rebuilds the snapshot, so hash-map layouts differ between runs.
pub fn verify_planner_determinism<R, Setup, Plan>(
    runs: usize,
    setup: Setup,
    plan: Plan,
) -> DeterminismResult
where
    R: Serialize,
    Setup: Fn() -> Simulation,
    Plan: Fn(&Simulation) -> R,
{
    verify_determinism(runs, 0, setup, |_| {}, |sim| output_hash(&plan(sim)))
}

/// Whether `f` leaves the snapshot and config unchanged.
pub fn verify_purity<R>(sim: &Simulation, f: impl FnOnce(&Simulation) -> R) -> bool {
    let before = sim.state_hash();
    let _ = f(sim);
    before == sim.state_hash()
}

/// First ground-combat day at which two identically built simulations differ.
///
/// `None` when they agree for all `days`.
pub fn find_first_divergence<F>(setup_fn: F, days: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for day in 1..=days {
        sim1.tick_ground_combat();
        sim2.tick_ground_combat();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(day);
        }
    }

    None
}

/// Whether a serialization round trip preserves the state hash.
pub fn verify_serialization_determinism<F>(setup_fn: F) -> bool
where
    F: Fn() -> Simulation,
{
    let sim = setup_fn();
    let hash_before = sim.state_hash();

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for planner and combat properties.
pub mod strategies {
    use proptest::prelude::*;

    use nebula_core::config::SimConfig;

    /// Troop strength, including zero.
    ///
    /// Range: 0 to 2000
    pub fn arb_strength() -> impl Strategy<Value = f64> {
        (0u32..20_000u32).prop_map(|v| f64::from(v) / 10.0)
    }

    /// Strictly positive defender strength.
    pub fn arb_defender_strength() -> impl Strategy<Value = f64> {
        (1u32..10_000u32).prop_map(|v| f64::from(v) / 10.0)
    }

    /// Fortification points, in whole installations of 10 points.
    pub fn arb_fort_points() -> impl Strategy<Value = f64> {
        (0u32..30u32).prop_map(|n| f64::from(n) * 10.0)
    }

    /// Defender artillery damage per day.
    pub fn arb_artillery() -> impl Strategy<Value = f64> {
        (0u32..50u32).prop_map(f64::from)
    }

    /// Troop margin factor.
    ///
    /// Range: 1.0 to 3.0
    pub fn arb_margin() -> impl Strategy<Value = f64> {
        (100u32..300u32).prop_map(|v| f64::from(v) / 100.0)
    }

    /// Config with randomized ground combat tunables.
    pub fn arb_combat_config() -> impl Strategy<Value = SimConfig> {
        (1u32..20u32, 0u32..20u32, 0u32..10u32).prop_map(|(loss, def, att)| SimConfig {
            ground_combat_loss_factor: f64::from(loss) / 100.0,
            fortification_defense_scale: f64::from(def) / 1000.0,
            fortification_attack_scale: f64::from(att) / 1000.0,
            ..SimConfig::default()
        })
    }

    /// Population and troop figures for one test colony.
    #[derive(Debug, Clone)]
    pub struct ColonyParams {
        /// Population, millions.
        pub population: f64,
        /// Population target, millions.
        pub population_target: f64,
        /// Population reserve, millions.
        pub population_reserve: f64,
        /// Ground forces.
        pub ground_forces: f64,
        /// Garrison target.
        pub garrison_target: f64,
    }

    /// Generate figures for a colony.
    pub fn arb_colony_params() -> impl Strategy<Value = ColonyParams> {
        (0u32..500, 0u32..500, 0u32..300, 0u32..300, 0u32..300).prop_map(
            |(population, target, reserve, forces, garrison)| ColonyParams {
                population: f64::from(population),
                population_target: f64::from(target),
                population_reserve: f64::from(reserve),
                ground_forces: f64::from(forces),
                garrison_target: f64::from(garrison),
            },
        )
    }

    /// Generate figures for up to `max_colonies` colonies.
    pub fn arb_colony_list(max_colonies: usize) -> impl Strategy<Value = Vec<ColonyParams>> {
        proptest::collection::vec(arb_colony_params(), 1..max_colonies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::logistics_chain;
    use nebula_core::planning::freight::{compute_freight_plan, FreightPlannerOptions};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_divergent_runs_are_reported() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_freight_plan_is_deterministic_and_pure() {
        let opts = FreightPlannerOptions::default();
        verify_planner_determinism(4, || logistics_chain(6), |sim| {
            compute_freight_plan(sim, 1, &opts)
        })
        .assert_deterministic();

        let sim = logistics_chain(6);
        assert!(verify_purity(&sim, |s| compute_freight_plan(s, 1, &opts)));
    }

    #[test]
    fn test_serialization_preserves_chain() {
        assert!(verify_serialization_determinism(|| logistics_chain(3)));
        assert_eq!(find_first_divergence(|| logistics_chain(3), 5), None);
    }

    #[test]
    fn test_output_hash_sees_float_bits() {
        assert_ne!(output_hash(&(0.1_f64 + 0.2)), output_hash(&0.3_f64));
        assert_eq!(output_hash(&vec![1.5_f64]), output_hash(&vec![1.5_f64]));
    }
}
