//! One aggregation pipeline instance.
//!
//! Owns a risk buffer and runs two threads over it: the ingestion loop
//! (driven by the readings subscription) and the zone aggregator (driven by a
//! ticker). Several pipelines can share one broker; each has its own buffer.
//!
//! Shutdown stops the ticker, unsubscribes from the readings topic, drains
//! whatever readings were already queued, joins both threads, and hands back
//! the buffered observations.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::buffer::SharedRiskBuffer;
use crate::config::ServiceConfig;
use crate::ingest::{IngestCounts, IngestStats, Ingestor};
use crate::model::{Observation, ZoneError};
use crate::scoring::auxiliary::AuxiliarySampler;
use crate::schedule::{Ticker, TickerStop};
use crate::transport::Broker;
use crate::zone::{Publisher, ZoneAggregator};

/// Tunables for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub readings_topic: String,
    pub zone_topic: String,
    pub threshold: f64,
    pub buffer_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            readings_topic: "sensors/data".to_string(),
            zone_topic: "risk/zone".to_string(),
            threshold: crate::scoring::DEFAULT_ALERT_THRESHOLD,
            buffer_capacity: crate::buffer::DEFAULT_CAPACITY,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            readings_topic: config.topics.readings.clone(),
            zone_topic: config.topics.zone.clone(),
            threshold: config.risk.threshold,
            buffer_capacity: config.risk.buffer_capacity,
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    broker: Arc<dyn Broker>,
    readings_topic: String,
    subscription_id: u64,
    buffer: SharedRiskBuffer,
    stats: Arc<IngestStats>,
    ticker_stop: TickerStop,
    ingest_thread: Option<JoinHandle<()>>,
    aggregator_thread: Option<JoinHandle<()>>,
}

/// Subscribes to the readings topic and starts both threads.
///
/// A subscribe failure is returned here and nothing is started; transport
/// trouble is a startup condition, not a per-message one.
pub fn start(
    settings: &PipelineSettings,
    broker: Arc<dyn Broker>,
    sampler: Box<dyn AuxiliarySampler>,
    mut ticker: Box<dyn Ticker>,
) -> Result<PipelineHandle, ZoneError> {
    let subscription = broker.subscribe(&settings.readings_topic)?;
    let subscription_id = subscription.id();

    let buffer = SharedRiskBuffer::with_capacity(settings.buffer_capacity);
    let mut ingestor = Ingestor::new(buffer.clone(), sampler, settings.threshold);
    let stats = ingestor.stats();

    let publisher = Publisher::new(Arc::clone(&broker), &settings.zone_topic);
    let aggregator = ZoneAggregator::new(buffer.clone(), publisher).with_stats(Arc::clone(&stats));
    let ticker_stop = ticker.stop_handle();

    let ingest_thread = thread::Builder::new()
        .name("riskzone-ingest".to_string())
        .spawn(move || ingestor.run(&subscription))
        .map_err(|e| ZoneError::Config(format!("failed to spawn ingest thread: {}", e)))?;

    let aggregator_thread = match thread::Builder::new()
        .name("riskzone-aggregator".to_string())
        .spawn(move || aggregator.run(ticker.as_mut()))
    {
        Ok(handle) => handle,
        Err(e) => {
            broker.unsubscribe(&settings.readings_topic, subscription_id);
            let _ = ingest_thread.join();
            return Err(ZoneError::Config(format!("failed to spawn aggregator thread: {}", e)));
        }
    };

    log::info!(
        target: "system",
        "pipeline started: {} -> {} (threshold {}, capacity {})",
        settings.readings_topic,
        settings.zone_topic,
        settings.threshold,
        settings.buffer_capacity
    );

    Ok(PipelineHandle {
        broker,
        readings_topic: settings.readings_topic.clone(),
        subscription_id,
        buffer,
        stats,
        ticker_stop,
        ingest_thread: Some(ingest_thread),
        aggregator_thread: Some(aggregator_thread),
    })
}

impl PipelineHandle {
    /// Shared handle to this pipeline's buffer.
    pub fn buffer(&self) -> &SharedRiskBuffer {
        &self.buffer
    }

    pub fn counts(&self) -> IngestCounts {
        self.stats.counts()
    }

    /// Stops both activities and returns the buffered observations.
    pub fn stop(mut self) -> Vec<Observation> {
        self.shutdown();
        let remaining = self.buffer.snapshot();
        log::info!(target: "system", "pipeline stopped with {} observations buffered", remaining.len());
        remaining
    }

    fn shutdown(&mut self) {
        self.ticker_stop.stop();
        self.broker.unsubscribe(&self.readings_topic, self.subscription_id);

        for handle in [self.aggregator_thread.take(), self.ingest_thread.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::error!(target: "system", "pipeline thread panicked during shutdown");
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.ingest_thread.is_some() || self.aggregator_thread.is_some() {
            self.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransportError;
    use crate::scoring::auxiliary::FixedSampler;
    use crate::schedule::ManualTicker;
    use crate::transport::{LocalBroker, Subscription};

    struct ClosedBroker;

    impl Broker for ClosedBroker {
        fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
            Err(TransportError::TopicClosed(topic.to_string()))
        }
        fn unsubscribe(&self, _topic: &str, _subscription_id: u64) {}
        fn publish(&self, topic: &str, _payload: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::TopicClosed(topic.to_string()))
        }
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = ServiceConfig::default();
        config.topics.zone = "alerts/zone".to_string();
        config.risk.buffer_capacity = 25;
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.zone_topic, "alerts/zone");
        assert_eq!(settings.buffer_capacity, 25);
        assert_eq!(
            PipelineSettings::from_config(&ServiceConfig::default()),
            PipelineSettings::default()
        );
    }

    #[test]
    fn test_subscribe_failure_is_fatal_at_startup() {
        let (ticker, _driver) = ManualTicker::new();
        let result = start(
            &PipelineSettings::default(),
            Arc::new(ClosedBroker),
            Box::new(FixedSampler::calm()),
            Box::new(ticker),
        );
        assert!(matches!(
            result,
            Err(ZoneError::Transport(TransportError::TopicClosed(_)))
        ));
    }

    #[test]
    fn test_stop_returns_buffered_observations() {
        let broker = Arc::new(LocalBroker::new());
        let (ticker, _driver) = ManualTicker::new();
        let handle = start(
            &PipelineSettings::default(),
            broker.clone(),
            Box::new(FixedSampler::calm()),
            Box::new(ticker),
        )
        .expect("pipeline should start");

        broker
            .publish("sensors/data", br#"{"id":1,"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#)
            .expect("publish");
        broker
            .publish("sensors/data", br#"{"id":2,"lat":1.0,"lon":2.0,"rainfall":1,"water":0}"#)
            .expect("publish");

        // Queued readings are drained before the ingest thread exits.
        let remaining = handle.stop();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].point(), [1.0, 2.0]);
        assert_eq!(broker.subscriber_count("sensors/data"), 0);
    }

    #[test]
    fn test_pipelines_keep_separate_buffers() {
        let broker = Arc::new(LocalBroker::new());
        let (ticker_a, _driver_a) = ManualTicker::new();
        let (ticker_b, _driver_b) = ManualTicker::new();
        let high = PipelineSettings::default();
        let strict = PipelineSettings { threshold: 0.5, ..PipelineSettings::default() };

        let a = start(&high, broker.clone(), Box::new(FixedSampler::calm()), Box::new(ticker_a))
            .expect("pipeline a");
        let b = start(&strict, broker.clone(), Box::new(FixedSampler::calm()), Box::new(ticker_b))
            .expect("pipeline b");

        broker
            .publish("sensors/data", br#"{"lat":1.0,"lon":2.0,"rainfall":200,"water":5}"#)
            .expect("publish");

        // 0.45 clears the default threshold but not 0.5.
        assert_eq!(a.stop().len(), 1);
        assert_eq!(b.stop().len(), 0);
    }
}
