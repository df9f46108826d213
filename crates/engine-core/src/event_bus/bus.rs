use model::events::Event;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// A subscription handle that can be used to unsubscribe from events.
#[derive(Debug, Clone)]
pub struct Subscription {
    event_type_id: TypeId,
    subscriber_id: u64,
}

type Senders = HashMap<u64, Box<dyn Any + Send + Sync>>;

/// Typed fan-out of lifecycle events. Publishing never blocks: a full
/// subscriber channel drops the event for that subscriber only.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<TypeId, Senders>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe<E>(&self, sender: mpsc::Sender<Arc<E>>) -> Subscription
    where
        E: Event + Clone,
    {
        let event_type_id = TypeId::of::<E>();
        let subscriber_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .write()
            .await
            .entry(event_type_id)
            .or_default()
            .insert(subscriber_id, Box::new(sender));

        debug!(
            event_type = std::any::type_name::<E>(),
            subscriber_id, "Subscribed to event"
        );

        Subscription {
            event_type_id,
            subscriber_id,
        }
    }

    /// Returns the number of subscribers the event was delivered to.
    pub async fn publish<E>(&self, event: E) -> usize
    where
        E: Event + Clone,
    {
        let subscribers = self.subscribers.read().await;
        let Some(type_subscribers) = subscribers.get(&TypeId::of::<E>()) else {
            return 0;
        };

        let event = Arc::new(event);
        let mut delivered = 0;
        for (subscriber_id, boxed_sender) in type_subscribers {
            let Some(sender) = boxed_sender.downcast_ref::<mpsc::Sender<Arc<E>>>() else {
                continue;
            };

            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    event_type = event.event_type(),
                    subscriber_id,
                    error = %e,
                    "Dropped event for subscriber"
                ),
            }
        }
        delivered
    }

    pub async fn unsubscribe(&self, subscription: Subscription) {
        let mut subscribers = self.subscribers.write().await;

        if let Some(type_subscribers) = subscribers.get_mut(&subscription.event_type_id) {
            type_subscribers.remove(&subscription.subscriber_id);
            if type_subscribers.is_empty() {
                subscribers.remove(&subscription.event_type_id);
            }
        }
    }

    pub async fn subscriber_count<E>(&self) -> usize
    where
        E: Event,
    {
        self.subscribers
            .read()
            .await
            .get(&TypeId::of::<E>())
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::events::{PollFailed, RowsPolled};

    fn rows_polled(row_count: usize) -> RowsPolled {
        RowsPolled {
            step: "orders".into(),
            row_count,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_typed_subscribers_only() {
        let bus = EventBus::new();
        let (rows_tx, mut rows_rx) = mpsc::channel::<Arc<RowsPolled>>(4);
        let (fail_tx, mut fail_rx) = mpsc::channel::<Arc<PollFailed>>(4);
        bus.subscribe(rows_tx).await;
        bus.subscribe(fail_tx).await;

        assert_eq!(bus.publish(rows_polled(3)).await, 1);
        assert_eq!(rows_rx.recv().await.unwrap().row_count, 3);
        assert!(fail_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::channel::<Arc<RowsPolled>>(1);
        bus.subscribe(tx).await;

        assert_eq!(bus.publish(rows_polled(1)).await, 1);
        assert_eq!(bus.publish(rows_polled(2)).await, 0);
        assert_eq!(rx.recv().await.unwrap().row_count, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::channel::<Arc<RowsPolled>>(1);
        let subscription = bus.subscribe(tx).await;
        assert_eq!(bus.subscriber_count::<RowsPolled>().await, 1);

        bus.unsubscribe(subscription).await;
        assert_eq!(bus.subscriber_count::<RowsPolled>().await, 0);
        assert_eq!(bus.publish(rows_polled(1)).await, 0);
    }
}
