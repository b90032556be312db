//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism to guard against:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Ships are always processed in sorted id order.
//!
//! - **System randomness**: every draw goes through a seeded
//!   [`naval_core::rng::SimRng`].
//!
//! - **Wall-clock time**: ticks are counted, never timed, inside the core.
//!
//! Floating-point math is deterministic for a given binary on a given
//! target, which is the guarantee the harness checks.

use std::thread;

use naval_core::simulation::Simulation;
use tracing::warn;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Example
///
/// ```
/// use naval_test_utils::determinism::verify_determinism;
/// use naval_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(3, 50, || skirmish(1), |sim| { sim.tick(); }, |sim| sim.state_hash());
/// result.assert_deterministic();
/// ```
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

/// Run a battle twice and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run `num_sims` battles on scoped threads and collect final hashes.
///
/// Each battle is built and run entirely on its own thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two battles tick by tick and return the first tick whose
/// hashes differ, or `None`.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            warn!(tick, "Battles diverged");
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use naval_core::data::TechLevels;
    use naval_core::math::Vec2;
    use proptest::prelude::*;

    /// An angle in degrees, including values far outside one turn.
    pub fn arb_angle() -> impl Strategy<Value = f64> {
        -1_080.0f64..1_080.0
    }

    /// A point inside the fixture sea's playable rectangle.
    pub fn arb_playable_point() -> impl Strategy<Value = Vec2> {
        (5_000.0f64..25_000.0, 5_000.0f64..25_000.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// A cell of a `rows` x `cols` grid.
    pub fn arb_cell(rows: usize, cols: usize) -> impl Strategy<Value = (usize, usize)> {
        (0..rows, 0..cols)
    }

    /// Any valid tech levels.
    pub fn arb_techs() -> impl Strategy<Value = TechLevels> {
        (0u8..=2, 0u8..=2, 0u8..=2, 0u8..=2).prop_map(|(guns, fire_control, computer, radar)| {
            TechLevels {
                guns,
                fire_control,
                computer,
                radar,
            }
        })
    }

    /// Priorities for a heap test.
    pub fn arb_priorities(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
        prop::collection::vec(-1_000i32..1_000, 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::skirmish;

    #[test]
    fn test_skirmish_is_deterministic() {
        verify_determinism(3, 200, || skirmish(5), |sim| {
            sim.tick();
        }, Simulation::state_hash)
        .assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| skirmish(11), 100), None);
    }

    #[test]
    fn test_parallel_runs_match() {
        run_parallel_simulations(|| skirmish(2), 4, 100).assert_deterministic();
    }
}
