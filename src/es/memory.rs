//! In-memory event store
//!
//! Hermetic implementation backing the test suite and single-process
//! experiments. Semantics mirror the Postgres store: the append mutex plays
//! the role of the per-aggregate row lock, the dense-version check plays the
//! role of the unique constraint, and the bus is offered the batch before
//! anything becomes visible.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::bus::EventBus;
use super::error::EventStoreError;
use super::event::{Event, Snapshot};
use super::store::EventStore;

#[derive(Default)]
struct Inner {
    /// Global log in append order. Events are stamped before the append
    /// lock is taken, so append order is not timestamp order; global reads
    /// sort explicitly.
    events: Vec<Event>,
    /// Per-aggregate historical snapshots, keyed by version.
    snapshots: HashMap<Uuid, BTreeMap<i64, Snapshot>>,
    next_event_id: i64,
}

impl Inner {
    fn current_version(&self, aggregate_id: Uuid) -> i64 {
        self.events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(0)
    }
}

/// Thread-safe in-memory event store.
pub struct InMemoryEventStore {
    bus: Arc<dyn EventBus>,
    inner: Mutex<Inner>,
}

impl InMemoryEventStore {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: &[Event],
        snapshot: Option<&Snapshot>,
    ) -> Result<(), EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        // The lock is held across the publish so that append + snapshot +
        // publish behave as one atomic unit, matching the Postgres store.
        let mut inner = self.inner.lock().await;

        let current = inner.current_version(first.aggregate_id);
        let mut staged = Vec::with_capacity(events.len());
        for (i, event) in events.iter().enumerate() {
            let expected = current + 1 + i as i64;
            if event.version != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id,
                    version: event.version,
                });
            }
            let mut event = event.clone();
            event.event_id = inner.next_event_id + 1 + i as i64;
            staged.push(event);
        }

        self.bus.publish(&staged).await?;

        inner.next_event_id += staged.len() as i64;
        inner.events.extend(staged);
        if let Some(snapshot) = snapshot {
            inner
                .snapshots
                .entry(snapshot.aggregate_id)
                .or_default()
                .insert(snapshot.version, snapshot.clone());
        }

        Ok(())
    }

    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<Event>, EventStoreError> {
        self.load_events_since(aggregate_id, 0).await
    }

    async fn load_events_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<Event>, EventStoreError> {
        let inner = self.inner.lock().await;
        let mut events: Vec<Event> = inner
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version > version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn load_events_between(
        &self,
        aggregate_id: Uuid,
        from: i64,
        to: i64,
    ) -> Result<Vec<Event>, EventStoreError> {
        let inner = self.inner.lock().await;
        let mut events: Vec<Event> = inner
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from && e.version <= to)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn load_all_events(&self) -> Result<Vec<Event>, EventStoreError> {
        let inner = self.inner.lock().await;
        let mut events = inner.events.clone();
        events.sort_by_key(|e| (e.timestamp, e.version));
        Ok(events)
    }

    async fn exists(&self, aggregate_id: Uuid) -> Result<bool, EventStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.events.iter().any(|e| e.aggregate_id == aggregate_id))
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), EventStoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .snapshots
            .entry(snapshot.aggregate_id)
            .or_default()
            .insert(snapshot.version, snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, EventStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .snapshots
            .get(&aggregate_id)
            .and_then(|by_version| by_version.values().next_back().cloned()))
    }

    async fn get_snapshot_by_version(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Option<Snapshot>, EventStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .snapshots
            .get(&aggregate_id)
            .and_then(|by_version| by_version.get(&version).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::es::bus::InMemoryEventBus;

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

    fn store() -> InMemoryEventStore {
        InMemoryEventStore::new(Arc::new(InMemoryEventBus::new("eventstore", 1)))
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_event_ids() {
        let store = store();
        let id = Uuid::new_v4();

        store
            .append(&[event_for(id, 1), event_for(id, 2)], None)
            .await
            .unwrap();

        let events = store.load_events(id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].event_id < events[1].event_id);
    }

    #[tokio::test]
    async fn test_append_rejects_stale_version() {
        let store = store();
        let id = Uuid::new_v4();

        store.append(&[event_for(id, 1)], None).await.unwrap();
        let err = store.append(&[event_for(id, 1)], None).await.unwrap_err();
        assert!(err.is_concurrency_conflict());

        // The aggregate is untouched by the failed append.
        assert_eq!(store.load_events(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_gapped_version() {
        let store = store();
        let id = Uuid::new_v4();

        store.append(&[event_for(id, 1)], None).await.unwrap();
        let err = store.append(&[event_for(id, 3)], None).await.unwrap_err();
        assert!(err.is_concurrency_conflict());
    }

    #[tokio::test]
    async fn test_snapshot_versions_coexist() {
        let store = store();
        let id = Uuid::new_v4();

        for version in [5, 10] {
            let snapshot = Snapshot {
                aggregate_id: id,
                aggregate_type: "BankAccount".into(),
                state: serde_json::json!({"v": version}),
                version,
            };
            store.save_snapshot(&snapshot).await.unwrap();
        }

        let latest = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(latest.version, 10);

        let exact = store.get_snapshot_by_version(id, 5).await.unwrap().unwrap();
        assert_eq!(exact.version, 5);

        assert!(store.get_snapshot_by_version(id, 7).await.unwrap().is_none());
    }
}
