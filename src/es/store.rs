//! Event store contract
//!
//! Append-only durable log of domain events, the sole source of truth.
//! Implementations must make `append` atomic: events, the optional snapshot,
//! and the bus publication commit together or not at all.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::EventStoreError;
use super::event::{Event, Snapshot};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one batch of events for a single aggregate, optionally
    /// upserting a snapshot, and offer the batch to the event bus, all
    /// inside one transaction.
    ///
    /// Writers on the same aggregate are serialized (per-aggregate lock);
    /// the unique `(aggregate_id, version)` constraint is the authoritative
    /// conflict check and surfaces as
    /// [`EventStoreError::ConcurrencyConflict`].
    async fn append(
        &self,
        events: &[Event],
        snapshot: Option<&Snapshot>,
    ) -> Result<(), EventStoreError>;

    /// All events of an aggregate, ascending by version.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<Event>, EventStoreError>;

    /// Events with `version > version`, ascending.
    async fn load_events_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<Event>, EventStoreError>;

    /// Events with `from <= version <= to`, ascending.
    async fn load_events_between(
        &self,
        aggregate_id: Uuid,
        from: i64,
        to: i64,
    ) -> Result<Vec<Event>, EventStoreError>;

    /// Global iteration in `(timestamp, version)` order, for replay.
    async fn load_all_events(&self) -> Result<Vec<Event>, EventStoreError>;

    /// Cheap existence probe.
    async fn exists(&self, aggregate_id: Uuid) -> Result<bool, EventStoreError>;

    /// Upsert a snapshot outside of an append.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), EventStoreError>;

    /// Latest snapshot for an aggregate.
    async fn get_snapshot(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, EventStoreError>;

    /// Snapshot at exactly `version`.
    async fn get_snapshot_by_version(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Option<Snapshot>, EventStoreError>;
}
