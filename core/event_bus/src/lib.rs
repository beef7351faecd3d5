// Path and File Name : /home/sensor/home-sensor-core/core/event_bus/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Async pub/sub event bus backed by the persistent event log. Central nervous system of the sensor: every published event is persisted first, then fanned out to matching subscribers.

pub mod error;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

/// Per-subscriber mailbox depth. A subscriber that falls this far behind has
/// its newest events dropped rather than letting publish() block on it; the
/// persistent event log still has the full history for `replay()`.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

pub use error::EventBusError;
use sensor_storage::Storage;

/// A single published event, already assigned a durable sequence number.
#[derive(Debug, Clone)]
pub struct Event {
    pub seq: i64,
    pub event_type: String,
    pub payload: Value,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub type EventCallback = Arc<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A handle to an active subscription. Pass to [`EventBus::unsubscribe`] to remove it.
#[derive(Clone)]
pub struct Subscription {
    id: Uuid,
    event_types: Vec<String>,
    sender: mpsc::Sender<Event>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, event_type: &str) -> bool {
        self.event_types.iter().any(|t| t == "*" || t == event_type)
    }
}

/// Async pub/sub event bus backed by a persistent, append-only event log.
///
/// Each subscriber gets its own bounded mailbox and a single dedicated
/// consumer task draining it in order: two events published in quick
/// succession always reach a given subscriber's callback in publication
/// order, even though callbacks for *different* subscribers run fully
/// concurrently. A panicking or slow handler never blocks publish() or any
/// other subscriber; a subscriber whose mailbox is full has its newest event
/// dropped rather than stalling the publisher.
pub struct EventBus {
    storage: Arc<Storage>,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl EventBus {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Persists the event, then schedules delivery to every matching subscriber.
    /// Returns the durable sequence number.
    pub async fn publish(
        &self,
        event_type: &str,
        payload: Value,
        source_id: Option<&str>,
    ) -> Result<i64, EventBusError> {
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| EventBusError::Validation(format!("payload not serializable: {e}")))?;

        let seq = self
            .storage
            .insert_event(event_type, &payload_json, source_id)
            .await?;

        let event = Event {
            seq,
            event_type: event_type.to_string(),
            payload,
            source_id: source_id.map(str::to_string),
            created_at: Utc::now(),
        };

        let matching: Vec<(Uuid, mpsc::Sender<Event>)> = {
            let subs = self.subscriptions.read();
            subs.iter()
                .filter(|s| s.matches(event_type))
                .map(|s| (s.id, s.sender.clone()))
                .collect()
        };

        for (id, sender) in matching {
            if let Err(err) = sender.try_send(event.clone()) {
                warn!(subscriber_id = %id, %err, "subscriber mailbox full or closed, dropping event");
            }
        }

        Ok(seq)
    }

    /// Subscribes a callback to the given event types. Use `["*"]` for all events.
    ///
    /// Spawns one consumer task that drains this subscriber's mailbox in
    /// order for as long as the returned `Subscription` (or a clone of it)
    /// is held; dropping every handle closes the mailbox and ends the task.
    pub fn subscribe(&self, event_types: Vec<String>, callback: EventCallback) -> Subscription {
        if event_types.is_empty() {
            warn!("subscribe() called with no event types; subscription will never match");
        }
        let (tx, mut rx) = mpsc::channel::<Event>(SUBSCRIBER_QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                callback(event).await;
            }
        });
        let sub = Subscription {
            id: Uuid::new_v4(),
            event_types,
            sender: tx,
        };
        self.subscriptions.write().push(sub.clone());
        sub
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.subscriptions.write().retain(|s| s.id != subscription.id);
    }

    /// Returns every event with seq greater than `since_seq`, ordered ascending.
    /// Used to catch reconnecting consumers up on missed events.
    pub async fn replay(&self, since_seq: i64) -> Result<Vec<Event>, EventBusError> {
        const REPLAY_BATCH: i64 = 10_000;
        let rows = self.storage.fetch_events_since(since_seq, REPLAY_BATCH).await?;
        rows.into_iter()
            .map(|row| {
                let payload: Value = serde_json::from_str(&row.payload).map_err(|e| {
                    EventBusError::StateCorruption(format!("event {} has unparseable payload: {e}", row.seq))
                })?;
                Ok(Event {
                    seq: row.seq,
                    event_type: row.event_type,
                    payload,
                    source_id: row.source_id,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let remaining = self.subscriptions.read().len();
        if remaining > 0 {
            error!("event bus dropped with {} active subscriptions", remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn bus() -> (EventBus, Arc<Storage>) {
        let storage = Arc::new(Storage::connect("sqlite::memory:").await.unwrap());
        (EventBus::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn publish_persists_and_returns_monotonic_seq() {
        let (bus, _storage) = bus().await;
        let s1 = bus.publish("device.discovered", serde_json::json!({"ip": "192.168.1.5"}), None).await.unwrap();
        let s2 = bus.publish("decoy.tripped", serde_json::json!({"decoy_id": 1}), None).await.unwrap();
        assert!(s2 > s1);
    }

    #[tokio::test]
    async fn wildcard_subscriber_receives_all_event_types() {
        let (bus, _storage) = bus().await;
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe(
            vec!["*".to_string()],
            Arc::new(move |_event| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        bus.publish("a.b", serde_json::json!({}), None).await.unwrap();
        bus.publish("c.d", serde_json::json!({}), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn typed_subscriber_ignores_non_matching_events() {
        let (bus, _storage) = bus().await;
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe(
            vec!["decoy.tripped".to_string()],
            Arc::new(move |_event| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        bus.publish("device.discovered", serde_json::json!({}), None).await.unwrap();
        bus.publish("decoy.tripped", serde_json::json!({}), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let (bus, _storage) = bus().await;
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let sub = bus.subscribe(
            vec!["*".to_string()],
            Arc::new(move |_event| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        bus.publish("a", serde_json::json!({}), None).await.unwrap();
        bus.unsubscribe(&sub);
        bus.publish("b", serde_json::json!({}), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_failing_subscriber_does_not_block_others() {
        let (bus, _storage) = bus().await;
        bus.subscribe(
            vec!["*".to_string()],
            Arc::new(|_event| Box::pin(async move { panic!("boom") })),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe(
            vec!["*".to_string()],
            Arc::new(move |_event| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        bus.publish("a", serde_json::json!({}), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_subscriber_receives_events_in_publication_order() {
        let (bus, _storage) = bus().await;
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(
            vec!["*".to_string()],
            Arc::new(move |event| {
                let seen = seen_clone.clone();
                Box::pin(async move {
                    // Yield before recording so a consumer racing across
                    // independently-scheduled tasks (the old per-delivery
                    // tokio::spawn model) would be likely to interleave.
                    tokio::task::yield_now().await;
                    seen.lock().push(event.seq);
                })
            }),
        );
        let mut published = Vec::new();
        for i in 0..20 {
            published.push(bus.publish("a", serde_json::json!({"i": i}), None).await.unwrap());
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(*seen.lock(), published);
    }

    #[tokio::test]
    async fn replay_returns_events_after_given_seq_in_order() {
        let (bus, _storage) = bus().await;
        let s1 = bus.publish("a", serde_json::json!({}), None).await.unwrap();
        let _s2 = bus.publish("b", serde_json::json!({}), None).await.unwrap();
        let s3 = bus.publish("c", serde_json::json!({}), None).await.unwrap();
        let replayed = bus.replay(s1).await.unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].seq, s3);
    }
}
