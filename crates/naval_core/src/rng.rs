//! Seedable random source shared by the simulation.
//!
//! Every random draw in a battle (fire-control noise, gun dispersion,
//! shell range spread, island placement) goes through a [`SimRng`]
//! created from an explicit seed, so a battle replays identically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The simulation's random number generator.
pub type SimRng = ChaCha8Rng;

/// Create a generator from a seed.
#[must_use]
pub fn seeded(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draw uniformly from `[-half_width, +half_width]`.
///
/// Returns exactly zero for a non-positive width without consuming a draw.
pub fn uniform(rng: &mut SimRng, half_width: f64) -> f64 {
    if half_width <= 0.0 || !half_width.is_finite() {
        return 0.0;
    }
    rng.gen_range(-half_width..=half_width)
}

/// Draw an integer uniformly from `[min, max]` (inclusive, order-insensitive).
pub fn uniform_usize(rng: &mut SimRng, min: usize, max: usize) -> usize {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}
