use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{
    record::TelemetryRecord,
    registry::{Subscriber, SubscriberRegistry},
};

/// Delivers records to every registered subscriber.
///
/// Deliveries within one broadcast run concurrently and independently:
/// a subscriber whose connection is gone or which does not accept the
/// record within the send timeout is removed from the registry, and the
/// rest are unaffected. A broadcast never fails its caller.
///
/// Broadcasts are awaited one record at a time by the relay loop, so
/// each subscriber sees records in production order.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    send_timeout: Duration,
}

impl Broadcaster {
    /// The default bound on a single subscriber send.
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(3);

    /// Create a broadcaster over the given registry.
    pub fn new(registry: Arc<SubscriberRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Deliver one record to the current registry snapshot.
    pub async fn broadcast(&self, record: TelemetryRecord) {
        let subscribers = self.registry.snapshot();

        if subscribers.is_empty() {
            trace!("No subscribers, discarding record");
            return;
        }

        trace!(%record, subscribers = subscribers.len(), "Broadcasting");

        join_all(
            subscribers
                .into_iter()
                .map(|subscriber| self.deliver(subscriber, record.clone())),
        )
        .await;
    }

    async fn deliver(&self, subscriber: Subscriber, record: TelemetryRecord) {
        let id = subscriber.id();

        match timeout(self.send_timeout, subscriber.sender.send(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(_closed)) => {
                debug!(%id, "Subscriber gone, removing");
                self.registry.remove(id);
            }
            Err(_elapsed) => {
                warn!(%id, "Subscriber did not accept record in time, removing");
                self.registry.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    fn record(n: u32) -> TelemetryRecord {
        TelemetryRecord::decode(format!("{{\"n\": {n}}}\n").as_bytes())
            .unwrap()
            .unwrap()
    }

    fn broadcaster(registry: &Arc<SubscriberRegistry>) -> Broadcaster {
        Broadcaster::new(Arc::clone(registry), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn all_subscribers_receive() {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = broadcaster(&registry);

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.add(tx1);
        registry.add(tx2);

        broadcaster.broadcast(record(1)).await;

        assert_eq!(rx1.recv().await.unwrap(), record(1));
        assert_eq!(rx2.recv().await.unwrap(), record(1));
    }

    #[tokio::test]
    async fn dead_subscriber_does_not_affect_the_others() {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = broadcaster(&registry);

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, rx2) = mpsc::channel::<TelemetryRecord>(8);
        let (tx3, mut rx3) = mpsc::channel(8);

        registry.add(tx1);
        let dead = registry.add(tx2);
        registry.add(tx3);

        // Connection already broken when the broadcast happens.
        drop(rx2);

        broadcaster.broadcast(record(1)).await;

        assert_eq!(rx1.recv().await.unwrap(), record(1));
        assert_eq!(rx3.recv().await.unwrap(), record(1));

        assert!(!registry.contains(dead));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn stalled_subscriber_is_removed_after_timeout() {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = broadcaster(&registry);

        // Capacity one and never drained: the second send stalls.
        let (tx_stalled, _rx_stalled) = mpsc::channel(1);
        let (tx_live, mut rx_live) = mpsc::channel(8);

        let stalled = registry.add(tx_stalled);
        registry.add(tx_live);

        broadcaster.broadcast(record(1)).await;
        broadcaster.broadcast(record(2)).await;

        assert_eq!(rx_live.recv().await.unwrap(), record(1));
        assert_eq!(rx_live.recv().await.unwrap(), record(2));

        assert!(!registry.contains(stalled));
    }

    #[tokio::test]
    async fn per_subscriber_order_matches_production_order() {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = broadcaster(&registry);

        let (tx, mut rx) = mpsc::channel(8);
        registry.add(tx);

        for n in 1..=3 {
            broadcaster.broadcast(record(n)).await;
        }

        for n in 1..=3 {
            assert_eq!(rx.recv().await.unwrap(), record(n));
        }
    }
}
