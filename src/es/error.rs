//! Event store errors

use uuid::Uuid;

use crate::domain::DomainError;

use super::bus::BusError;

/// Errors raised by the event store and the aggregate store facade.
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Another writer appended the same `(aggregate_id, version)` first.
    /// Retryable: reload the aggregate and re-run the command.
    #[error("concurrency conflict for aggregate {aggregate_id} at version {version}")]
    ConcurrencyConflict { aggregate_id: Uuid, version: i64 },

    /// An event's version does not match the expected successor.
    #[error("invalid event version for aggregate {aggregate_id}: expected {expected}, got {actual}")]
    InvalidEventVersion {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// The serializer registry has no codec for this event type.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Payload or snapshot state failed to encode/decode.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A replayed event violated a domain invariant.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Underlying storage fault, surfaced unchanged.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The bus rejected the committed batch; the append was rolled back.
    #[error("event bus error: {0}")]
    Bus(#[from] BusError),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }

    /// Whether retrying the whole command from `Load` may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}
