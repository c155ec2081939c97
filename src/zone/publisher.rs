//! Zone message publishing.
//!
//! Serializes a zone into its wire shape and hands it to the broker. Publish
//! is fire-and-forget: the caller logs a failure and carries on with the
//! next tick.

use std::sync::Arc;

use crate::model::{Zone, ZoneError};
use crate::transport::Broker;

/// Encodes a zone as the JSON body published on the zone topic.
pub fn encode_zone(zone: &Zone) -> Result<Vec<u8>, ZoneError> {
    serde_json::to_vec(zone).map_err(|e| ZoneError::Serialize(e.to_string()))
}

pub struct Publisher {
    broker: Arc<dyn Broker>,
    topic: String,
}

impl Publisher {
    pub fn new(broker: Arc<dyn Broker>, topic: &str) -> Self {
        Self { broker, topic: topic.to_string() }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish(&self, zone: &Zone) -> Result<(), ZoneError> {
        let payload = encode_zone(zone)?;
        self.broker.publish(&self.topic, &payload)?;
        log::info!(
            target: "publisher",
            "published zone to {}: {} vertices, centroid ({:.4}, {:.4}), risk {:.2}",
            self.topic,
            zone.hull.len(),
            zone.centroid[0],
            zone.centroid[1],
            zone.risk_detail.total
        );
        Ok(())
    }
}
