/// Multi-factor disaster risk scoring.
///
/// Each factor is min-max normalized against a fixed domain range, clamped
/// to [0, 1], and weighted. The weights sum to 1.0, so the composite total
/// is itself in [0, 1].
///
/// Submodules:
/// - `auxiliary` — sampling of the factors the reading payload does not carry.

pub mod auxiliary;

use crate::model::{Reading, RiskFactors};
use auxiliary::AuxiliaryFactors;

// ---------------------------------------------------------------------------
// Domain ranges and weights
// ---------------------------------------------------------------------------

/// Normalization domain for one factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRange {
    pub min: f64,
    pub max: f64,
}

pub const RAINFALL_RANGE: FactorRange = FactorRange { min: 0.0, max: 200.0 }; // mm/hr
pub const WATER_RANGE: FactorRange = FactorRange { min: 0.0, max: 5.0 }; // m
pub const TREMOR_RANGE: FactorRange = FactorRange { min: 0.0, max: 0.6 };
pub const CO2_RANGE: FactorRange = FactorRange { min: 400.0, max: 2000.0 }; // ppm
pub const SMOKE_RANGE: FactorRange = FactorRange { min: 0.0, max: 300.0 };
pub const TEMP_RANGE: FactorRange = FactorRange { min: 20.0, max: 60.0 }; // °C

pub const RAINFALL_WEIGHT: f64 = 0.25;
pub const WATER_WEIGHT: f64 = 0.20;
pub const TREMOR_WEIGHT: f64 = 0.20;
pub const CO2_WEIGHT: f64 = 0.15;
pub const SMOKE_WEIGHT: f64 = 0.10;
pub const TEMP_WEIGHT: f64 = 0.10;

/// Default alert threshold. Readings must score strictly above it to be
/// buffered.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.2;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// `clamp((x - min) / (max - min), 0, 1)`.
pub fn normalize(x: f64, range: FactorRange) -> f64 {
    ((x - range.min) / (range.max - range.min)).clamp(0.0, 1.0)
}

/// Weighted, normalized share of each factor in a reading's total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorContributions {
    pub rainfall: f64,
    pub water: f64,
    pub tremor: f64,
    pub co2: f64,
    pub smoke: f64,
    pub temp: f64,
}

impl FactorContributions {
    pub fn total(&self) -> f64 {
        self.rainfall + self.water + self.tremor + self.co2 + self.smoke + self.temp
    }
}

/// Computes the weighted contribution of each raw factor value.
pub fn contributions(factors: &RiskFactors) -> FactorContributions {
    FactorContributions {
        rainfall: RAINFALL_WEIGHT * normalize(factors.rainfall, RAINFALL_RANGE),
        water: WATER_WEIGHT * normalize(factors.water, WATER_RANGE),
        tremor: TREMOR_WEIGHT * normalize(factors.tremor, TREMOR_RANGE),
        co2: CO2_WEIGHT * normalize(factors.co2, CO2_RANGE),
        smoke: SMOKE_WEIGHT * normalize(factors.smoke, SMOKE_RANGE),
        temp: TEMP_WEIGHT * normalize(factors.temp, TEMP_RANGE),
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Scores a validated reading together with one draw of auxiliary factors.
///
/// Pure: the same inputs always produce the same breakdown.
pub fn score(reading: &Reading, aux: &AuxiliaryFactors) -> RiskFactors {
    let mut factors = RiskFactors {
        total: 0.0,
        rainfall: reading.rainfall,
        water: reading.water,
        tremor: aux.tremor,
        co2: aux.co2,
        smoke: aux.smoke,
        temp: aux.temp,
    };
    factors.total = contributions(&factors).total();
    factors
}

/// Returns `true` if a breakdown is high enough to enter the risk buffer.
///
/// Strictly greater than: a total exactly at the threshold is not buffered.
pub fn exceeds_threshold(factors: &RiskFactors, threshold: f64) -> bool {
    factors.total > threshold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn reading(rainfall: f64, water: f64) -> Reading {
        Reading { id: Some(1.0), lat: 12.97, lon: 77.59, rainfall, water }
    }

    fn calm() -> AuxiliaryFactors {
        AuxiliaryFactors { tremor: 0.0, co2: 400.0, smoke: 0.0, temp: 20.0 }
    }

    fn extreme() -> AuxiliaryFactors {
        AuxiliaryFactors { tremor: 0.6, co2: 2000.0, smoke: 300.0, temp: 60.0 }
    }

    // --- Normalization ------------------------------------------------------

    #[test]
    fn test_normalize_maps_range_to_unit_interval() {
        assert_eq!(normalize(0.0, RAINFALL_RANGE), 0.0);
        assert_eq!(normalize(100.0, RAINFALL_RANGE), 0.5);
        assert_eq!(normalize(200.0, RAINFALL_RANGE), 1.0);
    }

    #[test]
    fn test_normalize_clamps_outside_domain() {
        assert_eq!(normalize(350.0, CO2_RANGE), 0.0, "below floor clamps to 0");
        assert_eq!(normalize(9_000.0, CO2_RANGE), 1.0, "above ceiling clamps to 1");
        assert_eq!(normalize(-5.0, WATER_RANGE), 0.0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = RAINFALL_WEIGHT + WATER_WEIGHT + TREMOR_WEIGHT + CO2_WEIGHT + SMOKE_WEIGHT + TEMP_WEIGHT;
        assert!((sum - 1.0).abs() < EPS, "weights sum to {}", sum);
    }

    // --- Scoring ------------------------------------------------------------

    #[test]
    fn test_all_factors_at_floor_scores_zero() {
        let factors = score(&reading(0.0, 0.0), &calm());
        assert!(factors.total.abs() < EPS);
    }

    #[test]
    fn test_all_factors_at_ceiling_scores_one() {
        let factors = score(&reading(200.0, 5.0), &extreme());
        assert!((factors.total - 1.0).abs() < EPS, "got {}", factors.total);
    }

    #[test]
    fn test_max_rain_and_water_contribute_045() {
        let factors = score(&reading(200.0, 5.0), &calm());
        assert!((factors.total - 0.45).abs() < EPS, "got {}", factors.total);
    }

    #[test]
    fn test_score_is_deterministic_for_fixed_inputs() {
        let aux = AuxiliaryFactors { tremor: 0.3, co2: 1200.0, smoke: 150.0, temp: 40.0 };
        let a = score(&reading(200.0, 5.0), &aux);
        let b = score(&reading(200.0, 5.0), &aux);
        assert_eq!(a, b);
        // 0.25 + 0.20 + 0.20*0.5 + 0.15*0.5 + 0.10*0.5 + 0.10*0.5
        assert!((a.total - 0.725).abs() < EPS, "got {}", a.total);
        assert!((0.0..=1.0).contains(&a.total));
    }

    #[test]
    fn test_breakdown_carries_raw_values() {
        let aux = AuxiliaryFactors { tremor: 0.1, co2: 800.0, smoke: 42.0, temp: 31.5 };
        let factors = score(&reading(55.5, 1.25), &aux);
        assert_eq!(factors.rainfall, 55.5);
        assert_eq!(factors.water, 1.25);
        assert_eq!(factors.co2, 800.0);
        assert_eq!(factors.temp, 31.5);
    }

    #[test]
    fn test_extreme_raw_values_stay_within_unit_interval() {
        let aux = AuxiliaryFactors { tremor: 5.0, co2: 50_000.0, smoke: 10_000.0, temp: 500.0 };
        let factors = score(&reading(10_000.0, 100.0), &aux);
        assert!((factors.total - 1.0).abs() < EPS);
    }

    #[test]
    fn test_contributions_sum_to_total() {
        let aux = AuxiliaryFactors { tremor: 0.2, co2: 700.0, smoke: 90.0, temp: 28.0 };
        let factors = score(&reading(40.0, 0.8), &aux);
        let parts = contributions(&factors);
        assert!((parts.total() - factors.total).abs() < EPS);
        assert!((parts.rainfall - 0.05).abs() < EPS);
    }

    // --- Threshold ----------------------------------------------------------

    #[test]
    fn test_threshold_is_strictly_greater_than() {
        let mut factors = score(&reading(0.0, 0.0), &calm());
        factors.total = DEFAULT_ALERT_THRESHOLD;
        assert!(!exceeds_threshold(&factors, DEFAULT_ALERT_THRESHOLD));
        factors.total = DEFAULT_ALERT_THRESHOLD + 1e-6;
        assert!(exceeds_threshold(&factors, DEFAULT_ALERT_THRESHOLD));
    }
}
