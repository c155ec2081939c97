//! Zone aggregation and publishing.
//!
//! Submodules:
//! - `aggregator` — hull + centroid over the buffer on each cadence tick.
//! - `publisher` — wire encoding and publish to the zone topic.

pub mod aggregator;
pub mod publisher;

pub use aggregator::{build_zone_at, TickOutcome, ZoneAggregator};
pub use publisher::{encode_zone, Publisher};
