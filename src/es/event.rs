//! Event and snapshot envelopes
//!
//! Persistence-level records. The `data` payload is opaque JSON at this
//! layer; typed domain events live behind the serializer registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted domain event.
///
/// `event_id` is assigned by the store on append (0 until then).
/// `version` is the per-aggregate sequence: 1-based, strictly monotonic,
/// dense. `(aggregate_id, version)` is unique across the log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub event_id: i64,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub version: i64,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an unpersisted event envelope. The store assigns `event_id`;
    /// the aggregate store assigns `version` when serializing changes.
    pub fn new(
        aggregate_id: Uuid,
        aggregate_type: &str,
        event_type: &str,
        data: serde_json::Value,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_id: 0,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: event_type.to_string(),
            data,
            version: 0,
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// Deserialize the payload into a typed value.
    pub fn get_json_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} v{} (aggregate {})",
            self.aggregate_type, self.event_type, self.version, self.aggregate_id
        )
    }
}

/// Serialized aggregate state at a specific version.
///
/// Snapshots are keyed by `(aggregate_id, version)`; historical versions
/// coexist so point-in-time loads can pick the nearest one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Snapshot {
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub state: serde_json::Value,
    pub version: i64,
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} snapshot v{} (aggregate {})",
            self.aggregate_type, self.version, self.aggregate_id
        )
    }
}
