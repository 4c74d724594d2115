//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Injectable randomness for the physical models."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use rand::prelude::*;

/// Source of every random draw made by the component models.
pub trait NoiseSource: Send {
    /// A sample in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// A sample in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }
}

/// Builds a fresh noise source for each new session.
pub type NoiseFactory = Arc<dyn Fn() -> Box<dyn NoiseSource> + Send + Sync>;

/// `StdRng`-backed noise, reproducible when built from a seed.
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Factory handing every session the same seed, or entropy when `None`.
    pub fn factory(seed: Option<u64>) -> NoiseFactory {
        match seed {
            Some(seed) => Arc::new(move || Box::new(SeededNoise::from_seed(seed))),
            None => Arc::new(|| Box::new(SeededNoise::from_entropy())),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

impl fmt::Debug for SeededNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededNoise").finish_non_exhaustive()
    }
}

/// Degenerate source returning the same unit sample forever.
///
/// `ConstantNoise(0.0)` removes randomness from the models entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantNoise(pub f64);

impl ConstantNoise {
    pub fn factory(value: f64) -> NoiseFactory {
        Arc::new(move || Box::new(ConstantNoise(value)))
    }
}

impl NoiseSource for ConstantNoise {
    fn unit(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut a = SeededNoise::from_seed(42);
        let mut b = SeededNoise::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.unit(), b.unit());
        }
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut noise = SeededNoise::from_seed(7);
        for _ in 0..1000 {
            let sample = noise.uniform(-0.05, 0.05);
            assert!((-0.05..0.05).contains(&sample));
        }
    }

    #[test]
    fn constant_noise_maps_to_lower_bound() {
        let mut noise = ConstantNoise(0.0);
        assert_eq!(noise.uniform(25.0, 35.0), 25.0);
        let mut half = ConstantNoise(0.5);
        assert_eq!(half.uniform(-1.0, 1.0), 0.0);
    }
}
