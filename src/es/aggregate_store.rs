//! Aggregate store facade
//!
//! Load / LoadByVersion / Save on top of the event store: snapshots bound
//! replay cost, the serializer registry translates between domain events and
//! envelopes, and saving decides the snapshot cadence.

use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use super::aggregate::{Aggregate, AggregateState};
use super::error::EventStoreError;
use super::event::Event;
use super::serializer::EventSerializer;
use super::store::EventStore;

/// Default number of events between snapshots.
pub const DEFAULT_SNAPSHOT_FREQUENCY: i64 = 5;

pub struct AggregateStore<S: AggregateState, C: EventSerializer<S>> {
    store: Arc<dyn EventStore>,
    serializer: Arc<C>,
    snapshot_frequency: i64,
    _state: PhantomData<fn() -> S>,
}

impl<S: AggregateState, C: EventSerializer<S>> Clone for AggregateStore<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            serializer: Arc::clone(&self.serializer),
            snapshot_frequency: self.snapshot_frequency,
            _state: PhantomData,
        }
    }
}

impl<S: AggregateState, C: EventSerializer<S>> AggregateStore<S, C> {
    pub fn new(store: Arc<dyn EventStore>, serializer: C, snapshot_frequency: i64) -> Self {
        Self {
            store,
            serializer: Arc::new(serializer),
            snapshot_frequency: snapshot_frequency.max(1),
            _state: PhantomData,
        }
    }

    /// Rehydrate to the current version: latest snapshot plus tail events,
    /// or a full replay when no snapshot exists. An aggregate left at
    /// version 0 has no history.
    pub async fn load(&self, aggregate: &mut Aggregate<S>) -> Result<(), EventStoreError> {
        let aggregate_id = aggregate.id();

        if let Some(snapshot) = self.store.get_snapshot(aggregate_id).await? {
            *aggregate = serde_json::from_value(snapshot.state)?;
            let tail = self
                .store
                .load_events_since(aggregate_id, snapshot.version)
                .await?;
            self.replay(aggregate, &tail)?;
        } else {
            let events = self.store.load_events(aggregate_id).await?;
            self.replay(aggregate, &events)?;
        }

        tracing::debug!(aggregate = %aggregate, "aggregate loaded");
        Ok(())
    }

    /// Rehydrate to a past version: pick the snapshot at
    /// `(version / F) * F` when present, then replay the remaining range.
    pub async fn load_by_version(
        &self,
        aggregate: &mut Aggregate<S>,
        version: i64,
    ) -> Result<(), EventStoreError> {
        let aggregate_id = aggregate.id();
        let snapshot_version = version / self.snapshot_frequency * self.snapshot_frequency;

        let snapshot = self
            .store
            .get_snapshot_by_version(aggregate_id, snapshot_version)
            .await?;

        if let Some(snapshot) = snapshot {
            *aggregate = serde_json::from_value(snapshot.state)?;
            if snapshot.version < version {
                let tail = self
                    .store
                    .load_events_between(aggregate_id, snapshot.version + 1, version)
                    .await?;
                self.replay(aggregate, &tail)?;
            }
        } else {
            let events = self
                .store
                .load_events_between(aggregate_id, 1, version)
                .await?;
            self.replay(aggregate, &events)?;
        }

        tracing::debug!(aggregate = %aggregate, version, "aggregate loaded by version");
        Ok(())
    }

    /// Persist uncommitted changes: serialize each through the registry with
    /// its dense version, append atomically (with a snapshot when the final
    /// version lands on the cadence), then clear the changes.
    pub async fn save(&self, aggregate: &mut Aggregate<S>) -> Result<(), EventStoreError> {
        if aggregate.changes().is_empty() {
            tracing::debug!(aggregate = %aggregate, "no changes to save");
            return Ok(());
        }

        let base_version = aggregate.version() - aggregate.changes().len() as i64;
        let mut events = Vec::with_capacity(aggregate.changes().len());
        for (i, change) in aggregate.changes().iter().enumerate() {
            let mut event = self.serializer.serialize(aggregate, change)?;
            event.version = base_version + 1 + i as i64;
            events.push(event);
        }

        let snapshot = if aggregate.version() % self.snapshot_frequency == 0 {
            Some(aggregate.to_snapshot()?)
        } else {
            None
        };

        self.store.append(&events, snapshot.as_ref()).await?;
        aggregate.clear_changes();

        tracing::info!(aggregate = %aggregate, count = events.len(), "aggregate saved");
        Ok(())
    }

    pub async fn exists(&self, aggregate_id: Uuid) -> Result<bool, EventStoreError> {
        self.store.exists(aggregate_id).await
    }

    /// Raw envelopes of an aggregate, for history queries.
    pub async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<Event>, EventStoreError> {
        self.store.load_events(aggregate_id).await
    }

    pub fn snapshot_frequency(&self) -> i64 {
        self.snapshot_frequency
    }

    fn replay(&self, aggregate: &mut Aggregate<S>, events: &[Event]) -> Result<(), EventStoreError> {
        for event in events {
            if event.version != aggregate.version() + 1 {
                return Err(EventStoreError::InvalidEventVersion {
                    aggregate_id: aggregate.id(),
                    expected: aggregate.version() + 1,
                    actual: event.version,
                });
            }
            let domain_event = self.serializer.deserialize(event)?;
            aggregate.raise(&domain_event)?;
        }
        Ok(())
    }
}
