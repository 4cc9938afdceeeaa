//! Event bus
//!
//! Publishes committed event batches to a per-aggregate-type topic. The
//! publisher is invoked inside the event store transaction, so a publish
//! failure rolls the append back: no event becomes visible in the log that
//! was not offered to the bus.
//!
//! Delivery is at-least-once and ordered per partition; batches are keyed by
//! `aggregate_id` so consumers observe per-aggregate order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::event::Event;

/// Errors raised while publishing a batch.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),
}

/// Topic naming rule shared by publisher and consumers.
pub fn topic_name(prefix: &str, aggregate_type: &str) -> String {
    format!("{}_{}", prefix, aggregate_type)
}

/// Transport seam for committed event batches.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one committed batch. All events belong to the same aggregate;
    /// the topic derives from the batch's `aggregate_type`.
    async fn publish(&self, events: &[Event]) -> Result<(), BusError>;
}

/// One message on the bus: a serialized batch from a single commit.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub key: Uuid,
    pub payload: Vec<u8>,
}

/// In-process bus: a fixed set of partitions, each a broadcast channel.
///
/// Batches are routed by hashing the aggregate id, so all batches for one
/// aggregate land on the same partition and stay ordered. Consumers
/// subscribe per partition; a slow consumer that lags past the channel
/// capacity observes a `Lagged` error, the in-process analogue of an
/// at-least-once redelivery gap.
pub struct InMemoryEventBus {
    topic_prefix: String,
    partitions: Vec<broadcast::Sender<BusMessage>>,
}

const PARTITION_CAPACITY: usize = 256;

impl InMemoryEventBus {
    pub fn new(topic_prefix: &str, partitions: usize) -> Self {
        let partitions = (0..partitions.max(1))
            .map(|_| broadcast::channel(PARTITION_CAPACITY).0)
            .collect();
        Self {
            topic_prefix: topic_prefix.to_string(),
            partitions,
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    /// Subscribe to one partition. Messages published before the
    /// subscription are not redelivered.
    pub fn subscribe(&self, partition: usize) -> broadcast::Receiver<BusMessage> {
        self.partitions[partition % self.partitions.len()].subscribe()
    }

    fn partition_for(&self, key: Uuid) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions.len() as u64) as usize
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, events: &[Event]) -> Result<(), BusError> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let message = BusMessage {
            topic: topic_name(&self.topic_prefix, &first.aggregate_type),
            key: first.aggregate_id,
            payload: serde_json::to_vec(events)?,
        };

        let partition = self.partition_for(message.key);
        // A send error only means no live subscribers; the broker analogue
        // accepts batches regardless of consumer presence.
        if self.partitions[partition].send(message).is_err() {
            tracing::trace!(partition, "no subscribers on partition, batch dropped");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(aggregate_id: Uuid, version: i64) -> Event {
        let mut event = Event::new(
            aggregate_id,
            "BankAccount",
            "BALANCE_DEPOSITED_V1",
            serde_json::json!({"amount": 1, "payment_id": "p"}),
            None,
        );
        event.version = version;
        event
    }

    #[test]
    fn test_topic_name() {
        assert_eq!(topic_name("eventstore", "BankAccount"), "eventstore_BankAccount");
    }

    #[tokio::test]
    async fn test_same_aggregate_lands_on_same_partition_in_order() {
        let bus = InMemoryEventBus::new("eventstore", 4);
        let aggregate_id = Uuid::new_v4();

        let partition = bus.partition_for(aggregate_id);
        let mut rx = bus.subscribe(partition);

        bus.publish(&[event_for(aggregate_id, 1)]).await.unwrap();
        bus.publish(&[event_for(aggregate_id, 2)]).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.key, aggregate_id);

        let batch: Vec<Event> = serde_json::from_slice(&first.payload).unwrap();
        assert_eq!(batch[0].version, 1);
        let batch: Vec<Event> = serde_json::from_slice(&second.payload).unwrap();
        assert_eq!(batch[0].version, 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryEventBus::new("eventstore", 1);
        bus.publish(&[event_for(Uuid::new_v4(), 1)]).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let bus = InMemoryEventBus::new("eventstore", 1);
        bus.publish(&[]).await.unwrap();
    }
}
