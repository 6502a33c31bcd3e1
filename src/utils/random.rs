//! Deterministic random streams for the forecast pipeline.
//!
//! Every stage that draws randomness receives its own `ChaCha8Rng` seeded
//! from the scenario configuration, so two runs with identical seeds produce
//! byte-identical schedules and independent Monte-Carlo trials never share
//! stream state.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The three independent streams consumed by the pipeline:
/// clone selection, clone time shift, and VFR local-time generation.
pub struct ForecastStreams {
    pub clone_selection: ChaCha8Rng,
    pub time_shift: ChaCha8Rng,
    pub vfr_local_time: ChaCha8Rng,
}

impl ForecastStreams {
    pub fn from_seeds(clone_selection: u64, time_shift: u64, vfr_local_time: u64) -> Self {
        Self {
            clone_selection: ChaCha8Rng::seed_from_u64(clone_selection),
            time_shift: ChaCha8Rng::seed_from_u64(time_shift),
            vfr_local_time: ChaCha8Rng::seed_from_u64(vfr_local_time),
        }
    }
}

/// Box-Muller normal deviate. Consumes exactly two uniform draws per call,
/// which keeps stream consumption predictable for replay.
pub fn normal_draw<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let t1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let t2: f64 = rng.gen();
    mean + std_dev * (-2.0 * t1.ln()).sqrt() * (2.0 * std::f64::consts::PI * t2).cos()
}
