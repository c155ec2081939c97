//! Auxiliary risk factors.
//!
//! Tremor, CO₂, smoke and temperature are not part of the reading payload;
//! the field deployment has no sensors for them yet. They are sampled from
//! fixed plausible ranges through an `AuxiliarySampler` so that scoring stays
//! reproducible when a seeded or fixed sampler is injected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Tremor sampling range (peak ground acceleration, g).
pub const TREMOR_SAMPLE: (f64, f64) = (0.0, 0.6);
/// CO₂ sampling range, ppm. Starts below the normalization floor on purpose;
/// normalization clamps it.
pub const CO2_SAMPLE: (f64, f64) = (350.0, 1150.0);
/// Smoke density sampling range.
pub const SMOKE_SAMPLE: (f64, f64) = (0.0, 300.0);
/// Air temperature sampling range, °C.
pub const TEMP_SAMPLE: (f64, f64) = (20.0, 60.0);

/// One draw of the four auxiliary factors, in their natural units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxiliaryFactors {
    pub tremor: f64,
    pub co2: f64,
    pub smoke: f64,
    pub temp: f64,
}

/// Source of auxiliary factors for the scorer.
pub trait AuxiliarySampler: Send {
    fn sample(&mut self) -> AuxiliaryFactors;
}

/// Uniform sampling over the fixed ranges above.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    /// Reproducible sampler; the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Sampler seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    fn draw(&mut self, (min, max): (f64, f64)) -> f64 {
        self.rng.gen_range(min..max)
    }
}

impl AuxiliarySampler for RandomSampler {
    fn sample(&mut self) -> AuxiliaryFactors {
        AuxiliaryFactors {
            tremor: self.draw(TREMOR_SAMPLE),
            co2: self.draw(CO2_SAMPLE),
            smoke: self.draw(SMOKE_SAMPLE),
            temp: self.draw(TEMP_SAMPLE),
        }
    }
}

/// Always returns the same factors. Used for deterministic scoring.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub AuxiliaryFactors);

impl FixedSampler {
    /// Every auxiliary factor at the floor of its normalization range, so it
    /// contributes nothing to the total.
    pub fn calm() -> Self {
        Self(AuxiliaryFactors { tremor: 0.0, co2: 400.0, smoke: 0.0, temp: 20.0 })
    }
}

impl AuxiliarySampler for FixedSampler {
    fn sample(&mut self) -> AuxiliaryFactors {
        self.0
    }
}
