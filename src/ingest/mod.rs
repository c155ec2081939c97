/// Reading ingestion.
///
/// Parses raw messages from the readings topic, validates them, scores them,
/// and appends the ones above the alert threshold to the risk buffer.
/// A bad message is logged and dropped; it never stops the loop and never
/// touches the buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::buffer::SharedRiskBuffer;
use crate::logging;
use crate::model::{Observation, Reading, RiskFactors, ZoneError};
use crate::scoring::{self, auxiliary::AuxiliarySampler};
use crate::transport::Subscription;

// ---------------------------------------------------------------------------
// Parsing and validation
// ---------------------------------------------------------------------------

/// Wire shape of a reading. Every field is optional here so that a missing
/// field is reported as such rather than as a generic parse failure.
#[derive(Debug, Deserialize)]
struct RawReading {
    id: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
    rainfall: Option<f64>,
    water: Option<f64>,
}

/// Parses and validates one message body.
///
/// `lat` and `lon` are required. `rainfall` and `water` default to zero when
/// absent (producers omit them for dry or gauge-less nodes), but must be
/// finite and non-negative when present. Wrong JSON types are
/// `MalformedReading`.
pub fn parse_reading(payload: &[u8]) -> Result<Reading, ZoneError> {
    let raw: RawReading = serde_json::from_slice(payload)
        .map_err(|e| ZoneError::MalformedReading(e.to_string()))?;

    let lat = raw.lat.ok_or(ZoneError::MissingField("lat"))?;
    let lon = raw.lon.ok_or(ZoneError::MissingField("lon"))?;
    let rainfall = raw.rainfall.unwrap_or(0.0);
    let water = raw.water.unwrap_or(0.0);

    check_range("lat", lat, -90.0, 90.0)?;
    check_range("lon", lon, -180.0, 180.0)?;
    check_range("rainfall", rainfall, 0.0, f64::MAX)?;
    check_range("water", water, 0.0, f64::MAX)?;

    Ok(Reading { id: raw.id, lat, lon, rainfall, water })
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ZoneError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ZoneError::InvalidReading { field, value })
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Running totals for one ingestion loop. Shared with the aggregator, which
/// logs them on every tick.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    buffered: AtomicU64,
    below_threshold: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of `IngestStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub received: u64,
    pub buffered: u64,
    pub below_threshold: u64,
    pub rejected: u64,
}

impl IngestStats {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            received: self.received.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            below_threshold: self.below_threshold.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &IngestOutcome) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            IngestOutcome::Buffered(_) => &self.buffered,
            IngestOutcome::BelowThreshold(_) => &self.below_threshold,
            IngestOutcome::Rejected(_) => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Scored above the threshold and appended.
    Buffered(RiskFactors),
    /// Scored at or below the threshold; buffer untouched.
    BelowThreshold(RiskFactors),
    /// Dropped before scoring.
    Rejected(ZoneError),
}

/// Write side of the pipeline: owns the sampler, appends to the buffer.
pub struct Ingestor {
    buffer: SharedRiskBuffer,
    sampler: Box<dyn AuxiliarySampler>,
    threshold: f64,
    stats: Arc<IngestStats>,
}

impl Ingestor {
    pub fn new(buffer: SharedRiskBuffer, sampler: Box<dyn AuxiliarySampler>, threshold: f64) -> Self {
        Self { buffer, sampler, threshold, stats: Arc::new(IngestStats::default()) }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    pub fn buffer(&self) -> &SharedRiskBuffer {
        &self.buffer
    }

    /// Handles one message body end to end.
    pub fn handle(&mut self, payload: &[u8]) -> IngestOutcome {
        let outcome = match parse_reading(payload) {
            Ok(reading) => self.ingest_reading(&reading),
            Err(err) => {
                logging::log_ingest_failure(&err);
                IngestOutcome::Rejected(err)
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    /// Scores an already-validated reading and gates it into the buffer.
    pub fn ingest_reading(&mut self, reading: &Reading) -> IngestOutcome {
        let aux = self.sampler.sample();
        let risk = scoring::score(reading, &aux);

        if !scoring::exceeds_threshold(&risk, self.threshold) {
            return IngestOutcome::BelowThreshold(risk);
        }

        self.buffer.append(Observation { lat: reading.lat, lon: reading.lon, risk_detail: risk });
        log::debug!(
            target: "ingest",
            "node {:?} at ({:.4}, {:.4}) scored {:.3}, buffered",
            reading.id,
            reading.lat,
            reading.lon,
            risk.total
        );
        IngestOutcome::Buffered(risk)
    }

    /// Consumes messages until the subscription closes.
    pub fn run(&mut self, subscription: &Subscription) {
        log::info!(target: "ingest", "ingesting readings from {}", subscription.topic());
        for payload in subscription.iter() {
            self.handle(&payload);
        }
        log::info!(
            target: "ingest",
            "subscription to {} closed; {} observations buffered",
            subscription.topic(),
            self.buffer.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::auxiliary::{AuxiliaryFactors, FixedSampler};

    fn calm_ingestor() -> Ingestor {
        Ingestor::new(SharedRiskBuffer::default(), Box::new(FixedSampler::calm()), 0.2)
    }

    // --- Parsing ------------------------------------------------------------

    #[test]
    fn test_parse_full_reading() {
        let reading = parse_reading(br#"{"id":7,"lat":12.97,"lon":77.59,"rainfall":42.5,"water":1.2}"#)
            .expect("valid reading should parse");
        assert_eq!(reading.id, Some(7.0));
        assert_eq!(reading.lat, 12.97);
        assert_eq!(reading.rainfall, 42.5);
        assert_eq!(reading.water, 1.2);
    }

    #[test]
    fn test_missing_rainfall_and_water_default_to_zero() {
        let reading = parse_reading(br#"{"id":1,"lat":1.0,"lon":2.0}"#).expect("should parse");
        assert_eq!(reading.rainfall, 0.0);
        assert_eq!(reading.water, 0.0);
    }

    #[test]
    fn test_any_numeric_id_is_accepted() {
        for payload in [
            &br#"{"id":-1,"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#[..],
            &br#"{"id":3.5,"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#[..],
            &br#"{"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#[..],
        ] {
            let mut ingestor = calm_ingestor();
            let outcome = ingestor.handle(payload);
            match outcome {
                IngestOutcome::Buffered(risk) => assert!((risk.total - 0.45).abs() < 1e-9),
                other => panic!("expected Buffered for {}, got {:?}", String::from_utf8_lossy(payload), other),
            }
        }
        assert_eq!(parse_reading(br#"{"id":-1,"lat":1.0,"lon":2.0}"#).map(|r| r.id), Ok(Some(-1.0)));
        assert_eq!(parse_reading(br#"{"id":3.5,"lat":1.0,"lon":2.0}"#).map(|r| r.id), Ok(Some(3.5)));
    }

    #[test]
    fn test_missing_lat_is_rejected() {
        let err = parse_reading(br#"{"id":1,"lon":2.0,"rainfall":5}"#).unwrap_err();
        assert_eq!(err, ZoneError::MissingField("lat"));
    }

    #[test]
    fn test_missing_lon_is_rejected() {
        let err = parse_reading(br#"{"lat":2.0}"#).unwrap_err();
        assert_eq!(err, ZoneError::MissingField("lon"));
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let err = parse_reading(br#"{"lat":"north","lon":2.0}"#).unwrap_err();
        assert!(matches!(err, ZoneError::MalformedReading(_)), "got {:?}", err);
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_reading(b"rainfall=12").unwrap_err();
        assert!(matches!(err, ZoneError::MalformedReading(_)));
    }

    #[test]
    fn test_out_of_range_coordinates_are_invalid() {
        let err = parse_reading(br#"{"lat":91.0,"lon":0.0}"#).unwrap_err();
        assert_eq!(err, ZoneError::InvalidReading { field: "lat", value: 91.0 });
        let err = parse_reading(br#"{"lat":0.0,"lon":-180.5}"#).unwrap_err();
        assert_eq!(err, ZoneError::InvalidReading { field: "lon", value: -180.5 });
    }

    #[test]
    fn test_negative_water_is_invalid() {
        let err = parse_reading(br#"{"lat":0.0,"lon":0.0,"water":-0.5}"#).unwrap_err();
        assert_eq!(err, ZoneError::InvalidReading { field: "water", value: -0.5 });
    }

    // --- Threshold gate -----------------------------------------------------

    #[test]
    fn test_low_risk_reading_leaves_buffer_unchanged() {
        let mut ingestor = calm_ingestor();
        // 0.25 * 40/200 + 0.20 * 1/5 = 0.09
        let outcome = ingestor.handle(br#"{"id":1,"lat":1.0,"lon":2.0,"rainfall":40,"water":1}"#);
        assert!(matches!(outcome, IngestOutcome::BelowThreshold(_)), "got {:?}", outcome);
        assert!(ingestor.buffer().is_empty());
    }

    #[test]
    fn test_reading_exactly_at_threshold_is_not_buffered() {
        let mut ingestor = calm_ingestor();
        // 0.25 * 160/200 = 0.2 exactly
        let outcome = ingestor.handle(br#"{"lat":1.0,"lon":2.0,"rainfall":160,"water":0}"#);
        assert!(matches!(outcome, IngestOutcome::BelowThreshold(_)), "got {:?}", outcome);
        assert!(ingestor.buffer().is_empty());
    }

    #[test]
    fn test_high_risk_reading_adds_exactly_one_entry() {
        let mut ingestor = calm_ingestor();
        let outcome = ingestor.handle(br#"{"id":3,"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#);
        match outcome {
            IngestOutcome::Buffered(risk) => assert!((risk.total - 0.45).abs() < 1e-9),
            other => panic!("expected Buffered, got {:?}", other),
        }
        let snapshot = ingestor.buffer().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].point(), [1.0, 2.0]);
    }

    #[test]
    fn test_buffer_stays_bounded_under_sustained_high_risk() {
        let buffer = SharedRiskBuffer::with_capacity(100);
        let mut ingestor = Ingestor::new(buffer.clone(), Box::new(FixedSampler::calm()), 0.2);
        for n in 0..130 {
            let payload = format!(r#"{{"id":{},"lat":{},"lon":0.0,"rainfall":200,"water":5}}"#, n, n as f64 * 0.1);
            ingestor.handle(payload.as_bytes());
        }
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert!((snapshot[0].lat - 3.0).abs() < 1e-9, "oldest 30 were evicted");
    }

    #[test]
    fn test_auxiliary_factors_can_push_reading_over_threshold() {
        let hot = AuxiliaryFactors { tremor: 0.6, co2: 400.0, smoke: 0.0, temp: 20.0 };
        let mut ingestor = Ingestor::new(SharedRiskBuffer::default(), Box::new(FixedSampler(hot)), 0.2);
        // Tremor alone contributes 0.20; any rain tips it over.
        let outcome = ingestor.handle(br#"{"lat":1.0,"lon":2.0,"rainfall":10}"#);
        assert!(matches!(outcome, IngestOutcome::Buffered(_)));
    }

    // --- Isolation and counters ---------------------------------------------

    #[test]
    fn test_bad_messages_do_not_disturb_buffer() {
        let mut ingestor = calm_ingestor();
        ingestor.handle(br#"{"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#);
        ingestor.handle(b"garbage");
        ingestor.handle(br#"{"lon":2.0}"#);
        ingestor.handle(br#"{"lat":3.0,"lon":4.0,"rainfall":200,"water":5}"#);

        let snapshot = ingestor.buffer().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].point(), [3.0, 4.0]);

        let counts = ingestor.stats().counts();
        assert_eq!(
            counts,
            IngestCounts { received: 4, buffered: 2, below_threshold: 0, rejected: 2 }
        );
    }

    #[test]
    fn test_rejected_outcome_keeps_its_error_when_cloned() {
        let mut ingestor = calm_ingestor();
        let outcome = ingestor.handle(br#"{"lat":95.0,"lon":2.0}"#);
        let copy = outcome.clone();
        assert_eq!(copy, IngestOutcome::Rejected(ZoneError::InvalidReading { field: "lat", value: 95.0 }));
        assert_eq!(copy, outcome);
    }
}
