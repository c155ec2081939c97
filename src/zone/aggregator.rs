//! Danger zone aggregation.
//!
//! On every cadence tick the aggregator copies the risk buffer, wraps the
//! buffered locations in a convex hull, and publishes the hull with its
//! vertex centroid and the newest observation's risk breakdown.
//!
//! # Clock injection
//! `build_zone_at` and `ZoneAggregator::tick_at` take `now` as a parameter;
//! only the ticker-driven `run` loop reads the real clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::buffer::SharedRiskBuffer;
use crate::geometry::{self, Point};
use crate::ingest::IngestStats;
use crate::logging;
use crate::model::{Observation, Zone};
use crate::schedule::Ticker;
use crate::zone::publisher::Publisher;

/// Minimum buffered observations before a tick builds a zone.
pub const MIN_ZONE_POINTS: usize = 3;

// ---------------------------------------------------------------------------
// Zone construction
// ---------------------------------------------------------------------------

/// Builds the zone for a buffer snapshot, stamped with `now`.
///
/// Returns `None` only when the snapshot holds fewer than three
/// observations. Collinear or coincident observations still build a zone;
/// its hull is the degenerate segment or single point and its centroid the
/// mean of those vertices.
pub fn build_zone_at(snapshot: &[Observation], now: DateTime<Utc>) -> Option<Zone> {
    if snapshot.len() < MIN_ZONE_POINTS {
        return None;
    }

    let points: Vec<Point> = snapshot.iter().map(Observation::point).collect();
    let hull = geometry::convex_hull(&points);
    let centroid = geometry::vertex_centroid(&hull)?;
    let latest = snapshot.last()?;

    Some(Zone {
        hull,
        centroid,
        ts: now.timestamp_millis(),
        risk_detail: latest.risk_detail,
    })
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Result of one aggregation tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Fewer than three observations buffered; nothing computed.
    Skipped { buffered: usize },
    Published(Zone),
    /// The zone was built but the broker refused it.
    PublishFailed(Zone),
}

/// Read side of the pipeline.
pub struct ZoneAggregator {
    buffer: SharedRiskBuffer,
    publisher: Publisher,
    stats: Option<Arc<IngestStats>>,
}

impl ZoneAggregator {
    pub fn new(buffer: SharedRiskBuffer, publisher: Publisher) -> Self {
        Self { buffer, publisher, stats: None }
    }

    /// Logs these ingestion counters alongside every tick.
    pub fn with_stats(mut self, stats: Arc<IngestStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Runs one tick against the buffer as it is right now.
    pub fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let snapshot = self.buffer.snapshot();
        let buffered = snapshot.len();

        if let Some(stats) = &self.stats {
            let counts = stats.counts();
            logging::log_tick_summary(counts.received, counts.rejected, buffered);
        }

        let Some(zone) = build_zone_at(&snapshot, now) else {
            log::debug!(target: "aggregator", "{} observations buffered, skipping tick", buffered);
            return TickOutcome::Skipped { buffered };
        };
        if zone.hull.len() < MIN_ZONE_POINTS {
            log::warn!(
                target: "aggregator",
                "{} buffered observations are collinear or coincident; publishing a {}-vertex zone",
                buffered,
                zone.hull.len()
            );
        }

        match self.publisher.publish(&zone) {
            Ok(()) => TickOutcome::Published(zone),
            Err(err) => {
                log::error!(target: "publisher", "zone publish to {} failed: {}", self.publisher.topic(), err);
                TickOutcome::PublishFailed(zone)
            }
        }
    }

    pub fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now())
    }

    /// Ticks until `ticker` is stopped.
    pub fn run(&self, ticker: &mut dyn Ticker) {
        log::info!(target: "aggregator", "zone aggregation started, publishing to {}", self.publisher.topic());
        while ticker.wait_tick() {
            self.tick();
        }
        log::info!(target: "aggregator", "zone aggregation stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
