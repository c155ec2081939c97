//! Disaster risk zone aggregation service.
//!
//! Scores geotagged environmental readings, keeps a bounded history of the
//! elevated-risk ones, and on a fixed cadence publishes a danger zone (convex
//! hull, centroid, latest risk breakdown) for downstream alerting.
//!
//! Data flow:
//! `readings topic → ingest → scoring → buffer → [tick] → zone → zone topic`

pub mod buffer;
pub mod config;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod schedule;
pub mod scoring;
pub mod transport;
pub mod zone;
