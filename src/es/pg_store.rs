//! Postgres event store
//!
//! Append path, inside one transaction: take the per-aggregate row lock,
//! insert the batch in order, upsert the snapshot when provided, offer the
//! batch to the event bus, commit. A unique violation on
//! `(aggregate_id, version)` maps to `ConcurrencyConflict`; a bus failure
//! rolls the whole append back.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::bus::EventBus;
use super::error::EventStoreError;
use super::event::{Event, Snapshot};
use super::store::EventStore;

const SAVE_EVENT_QUERY: &str = r#"
    INSERT INTO events (aggregate_id, aggregate_type, event_type, data, version, metadata, timestamp)
    VALUES ($1, $2, $3, $4, $5, $6, now())
"#;

const GET_EVENTS_QUERY: &str = r#"
    SELECT event_id, aggregate_id, aggregate_type, event_type, data, version, metadata, timestamp
    FROM events WHERE aggregate_id = $1 ORDER BY version ASC
"#;

const GET_EVENTS_SINCE_QUERY: &str = r#"
    SELECT event_id, aggregate_id, aggregate_type, event_type, data, version, metadata, timestamp
    FROM events WHERE aggregate_id = $1 AND version > $2 ORDER BY version ASC
"#;

const GET_EVENTS_BETWEEN_QUERY: &str = r#"
    SELECT event_id, aggregate_id, aggregate_type, event_type, data, version, metadata, timestamp
    FROM events WHERE aggregate_id = $1 AND version BETWEEN $2 AND $3 ORDER BY version ASC
"#;

const GET_ALL_EVENTS_QUERY: &str = r#"
    SELECT event_id, aggregate_id, aggregate_type, event_type, data, version, metadata, timestamp
    FROM events ORDER BY timestamp ASC, version ASC
"#;

const EXISTS_QUERY: &str = r#"
    SELECT aggregate_id FROM events WHERE aggregate_id = $1 LIMIT 1
"#;

const LOCK_AGGREGATE_QUERY: &str = r#"
    SELECT aggregate_id FROM events WHERE aggregate_id = $1 LIMIT 1 FOR UPDATE
"#;

const SAVE_SNAPSHOT_QUERY: &str = r#"
    INSERT INTO snapshots (aggregate_id, aggregate_type, state, version, timestamp)
    VALUES ($1, $2, $3, $4, now())
    ON CONFLICT (aggregate_id, version)
    DO UPDATE SET state = EXCLUDED.state, timestamp = now()
"#;

const GET_SNAPSHOT_QUERY: &str = r#"
    SELECT aggregate_id, aggregate_type, state, version
    FROM snapshots WHERE aggregate_id = $1 ORDER BY version DESC LIMIT 1
"#;

const GET_SNAPSHOT_BY_VERSION_QUERY: &str = r#"
    SELECT aggregate_id, aggregate_type, state, version
    FROM snapshots WHERE aggregate_id = $1 AND version = $2
"#;

/// Event store backed by Postgres. The bus is invoked inside the append
/// transaction, which bounds commit latency by bus latency; an outbox table
/// dispatcher can replace the inline publish behind the same [`EventBus`]
/// seam if that trade-off is unacceptable.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    bus: Arc<dyn EventBus>,
}

impl PgEventStore {
    pub fn new(pool: PgPool, bus: Arc<dyn EventBus>) -> Self {
        Self { pool, bus }
    }

    fn map_insert_error(err: sqlx::Error, aggregate_id: Uuid, version: i64) -> EventStoreError {
        if let sqlx::Error::Database(ref db_err) = err {
            // 23505: unique violation on (aggregate_id, version)
            if db_err.code().as_deref() == Some("23505") {
                return EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    version,
                };
            }
        }
        EventStoreError::Database(err)
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(
        &self,
        events: &[Event],
        snapshot: Option<&Snapshot>,
    ) -> Result<(), EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;

        // Serialize concurrent writers on this aggregate. For a brand new
        // aggregate there is no row to lock; the unique constraint below is
        // the authoritative check either way.
        sqlx::query(LOCK_AGGREGATE_QUERY)
            .bind(first.aggregate_id)
            .fetch_optional(&mut *tx)
            .await?;

        for event in events {
            sqlx::query(SAVE_EVENT_QUERY)
                .bind(event.aggregate_id)
                .bind(&event.aggregate_type)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(event.version)
                .bind(&event.metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::map_insert_error(e, event.aggregate_id, event.version))?;
        }

        if let Some(snapshot) = snapshot {
            sqlx::query(SAVE_SNAPSHOT_QUERY)
                .bind(snapshot.aggregate_id)
                .bind(&snapshot.aggregate_type)
                .bind(&snapshot.state)
                .bind(snapshot.version)
                .execute(&mut *tx)
                .await?;
        }

        // Publish before commit: a bus failure drops the transaction, so no
        // event is visible in the log that was not offered to the bus.
        self.bus.publish(events).await?;

        tx.commit().await?;

        tracing::debug!(
            aggregate_id = %first.aggregate_id,
            count = events.len(),
            last_version = events.last().map(|e| e.version),
            "appended event batch"
        );

        Ok(())
    }

    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<Event>, EventStoreError> {
        let events = sqlx::query_as::<_, Event>(GET_EVENTS_QUERY)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn load_events_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<Event>, EventStoreError> {
        let events = sqlx::query_as::<_, Event>(GET_EVENTS_SINCE_QUERY)
            .bind(aggregate_id)
            .bind(version)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn load_events_between(
        &self,
        aggregate_id: Uuid,
        from: i64,
        to: i64,
    ) -> Result<Vec<Event>, EventStoreError> {
        let events = sqlx::query_as::<_, Event>(GET_EVENTS_BETWEEN_QUERY)
            .bind(aggregate_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn load_all_events(&self) -> Result<Vec<Event>, EventStoreError> {
        let events = sqlx::query_as::<_, Event>(GET_ALL_EVENTS_QUERY)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn exists(&self, aggregate_id: Uuid) -> Result<bool, EventStoreError> {
        let row: Option<Uuid> = sqlx::query_scalar(EXISTS_QUERY)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), EventStoreError> {
        sqlx::query(SAVE_SNAPSHOT_QUERY)
            .bind(snapshot.aggregate_id)
            .bind(&snapshot.aggregate_type)
            .bind(&snapshot.state)
            .bind(snapshot.version)
            .execute(&self.pool)
            .await?;

        tracing::debug!(snapshot = %snapshot, "snapshot saved");
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, EventStoreError> {
        let snapshot = sqlx::query_as::<_, Snapshot>(GET_SNAPSHOT_QUERY)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(snapshot)
    }

    async fn get_snapshot_by_version(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Option<Snapshot>, EventStoreError> {
        let snapshot = sqlx::query_as::<_, Snapshot>(GET_SNAPSHOT_BY_VERSION_QUERY)
            .bind(aggregate_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;
        Ok(snapshot)
    }
}
