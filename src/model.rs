/// Core data types for the risk zone service.
///
/// This module defines the shared domain model imported by all other modules:
/// inbound readings, the per-reading risk breakdown, buffered observations,
/// the outbound zone message, and the crate error types. It contains no I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A validated environmental reading from one sensor node.
///
/// Produced by `ingest::parse_reading` from a raw message on the readings
/// topic. Coordinates are WGS-84; rainfall and water are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Producer-assigned node id. Any JSON number is accepted; carried for
    /// diagnostics only.
    pub id: Option<f64>,
    pub lat: f64,
    pub lon: f64,
    /// Rainfall intensity, mm/hr.
    pub rainfall: f64,
    /// Water level, meters.
    pub water: f64,
}

/// Risk breakdown for one reading, as carried in the zone message.
///
/// Factor fields hold the raw measured or sampled values in their natural
/// units (mm/hr, m, ppm, ...). `total` is the weighted sum of the normalized
/// factors and always lies in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub total: f64,
    pub rainfall: f64,
    pub water: f64,
    pub tremor: f64,
    pub co2: f64,
    pub smoke: f64,
    pub temp: f64,
}

// ---------------------------------------------------------------------------
// Buffered and derived types
// ---------------------------------------------------------------------------

/// A location whose reading scored above the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "riskDetail")]
    pub risk_detail: RiskFactors,
}

impl Observation {
    /// The observation's location as a planar `[lat, lon]` point.
    pub fn point(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// The danger zone published on each emitting aggregator tick.
///
/// Serializes to the outbound wire shape:
/// `{ hull, centroid, ts, riskDetail }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Hull vertices as `[lat, lon]`, counter-clockwise, start not repeated.
    /// Collinear or coincident observations give a 2- or 1-vertex hull.
    pub hull: Vec<[f64; 2]>,
    /// Mean of the hull vertices.
    pub centroid: [f64; 2],
    /// Epoch milliseconds at which the zone was computed.
    pub ts: i64,
    /// Breakdown of the most recent buffered observation.
    #[serde(rename = "riskDetail")]
    pub risk_detail: RiskFactors,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the publish/subscribe layer and its bridges.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The topic has no route (broker shut down or subscription dropped).
    #[error("topic closed: {0}")]
    TopicClosed(String),
    /// Non-2xx response from an HTTP publish endpoint.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The HTTP request could not be sent.
    #[error("request failed: {0}")]
    Request(String),
}

/// Errors that can arise while ingesting readings or running the pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ZoneError {
    /// The message body is not valid JSON or a field has the wrong type.
    #[error("Malformed reading: {0}")]
    MalformedReading(String),
    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    /// A field is present and numeric but outside its valid domain.
    #[error("Invalid reading: {field} = {value}")]
    InvalidReading { field: &'static str, value: f64 },
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
