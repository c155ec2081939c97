/// Publish/subscribe plumbing.
///
/// The pipeline talks to its message broker only through the `Broker` trait:
/// subscribe to a topic, unsubscribe, publish a payload. Delivery is assumed
/// in order per topic to every current subscriber.
///
/// Submodules:
/// - `http` — forwards published messages to an HTTP publish endpoint.

pub mod http;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::model::TransportError;

// ---------------------------------------------------------------------------
// Broker interface
// ---------------------------------------------------------------------------

/// A live subscription to one topic.
///
/// Messages queue in the subscription until read. Iteration ends once the
/// broker drops the route (unsubscribe or broker shutdown) and the queue
/// is drained.
pub struct Subscription {
    id: u64,
    topic: String,
    rx: Receiver<Vec<u8>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Blocks until the next message; `None` once the route is closed.
    pub fn recv(&self) -> Option<Vec<u8>> {
        self.rx.recv().ok()
    }

    /// Like `recv`, bounded by `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Next queued message, if any, without blocking.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.rx.iter()
    }
}

/// Minimal publish/subscribe surface used by the pipeline.
pub trait Broker: Send + Sync {
    fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError>;

    /// Drops the route for `subscription`. Already-queued messages stay
    /// readable.
    fn unsubscribe(&self, topic: &str, subscription_id: u64);

    /// Fire-and-forget publish to every current subscriber of `topic`.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// In-process broker
// ---------------------------------------------------------------------------

/// In-process broker with per-topic fan-out over channels.
#[derive(Default)]
pub struct LocalBroker {
    routes: Mutex<HashMap<String, Vec<(u64, Sender<Vec<u8>>)>>>,
    next_id: AtomicU64,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, Sender<Vec<u8>>)>>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.routes().get(topic).map(Vec::len).unwrap_or(0)
    }

    /// Drops every route. Subscribers drain what is queued, then stop.
    pub fn shutdown(&self) {
        self.routes().clear();
    }
}

impl Broker for LocalBroker {
    fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.routes().entry(topic.to_string()).or_default().push((id, tx));
        log::debug!(target: "transport", "subscribed #{} to {}", id, topic);
        Ok(Subscription { id, topic: topic.to_string(), rx })
    }

    fn unsubscribe(&self, topic: &str, subscription_id: u64) {
        let mut routes = self.routes();
        if let Some(subscribers) = routes.get_mut(topic) {
            subscribers.retain(|(id, _)| *id != subscription_id);
            if subscribers.is_empty() {
                routes.remove(topic);
            }
        }
        log::debug!(target: "transport", "unsubscribed #{} from {}", subscription_id, topic);
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut routes = self.routes();
        if let Some(subscribers) = routes.get_mut(topic) {
            // Prune subscribers whose receiving end was dropped.
            subscribers.retain(|(_, tx)| tx.send(payload.to_vec()).is_ok());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(500);

    #[test]
    fn test_publish_reaches_every_subscriber_in_order() {
        let broker = LocalBroker::new();
        let a = broker.subscribe("sensors/data").expect("subscribe");
        let b = broker.subscribe("sensors/data").expect("subscribe");

        broker.publish("sensors/data", b"one").expect("publish");
        broker.publish("sensors/data", b"two").expect("publish");

        for sub in [&a, &b] {
            assert_eq!(sub.recv_timeout(WAIT).expect("first"), b"one".to_vec());
            assert_eq!(sub.recv_timeout(WAIT).expect("second"), b"two".to_vec());
        }
    }

    #[test]
    fn test_topics_are_isolated() {
        let broker = LocalBroker::new();
        let readings = broker.subscribe("sensors/data").expect("subscribe");
        broker.publish("risk/zone", b"zone").expect("publish");
        assert!(readings.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let broker = LocalBroker::new();
        assert!(broker.publish("risk/zone", b"{}").is_ok());
    }

    #[test]
    fn test_unsubscribe_ends_iteration_after_drain() {
        let broker = LocalBroker::new();
        let sub = broker.subscribe("sensors/data").expect("subscribe");
        broker.publish("sensors/data", b"queued").expect("publish");
        broker.unsubscribe("sensors/data", sub.id());

        let drained: Vec<_> = sub.iter().collect();
        assert_eq!(drained, vec![b"queued".to_vec()]);
        assert_eq!(broker.subscriber_count("sensors/data"), 0);
    }

    #[test]
    fn test_dropped_subscription_is_pruned_on_publish() {
        let broker = LocalBroker::new();
        let sub = broker.subscribe("risk/zone").expect("subscribe");
        drop(sub);
        broker.publish("risk/zone", b"{}").expect("publish");
        assert_eq!(broker.subscriber_count("risk/zone"), 0);
    }

    #[test]
    fn test_shutdown_closes_all_routes() {
        let broker = LocalBroker::new();
        let sub = broker.subscribe("sensors/data").expect("subscribe");
        broker.shutdown();
        assert!(sub.recv().is_none());
    }
}
