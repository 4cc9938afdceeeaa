//! Events history query
//!
//! Returns the raw event envelopes of an aggregate. Payloads the registry
//! cannot decode are passed through verbatim for that event only, so one
//! bad row never hides the rest of the history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{BankAccountSerializer, BankAccountStore};
use crate::error::AppResult;
use crate::es::EventSerializer;

#[derive(Debug, Clone)]
pub struct EventsHistoryQuery {
    pub aggregate_id: Uuid,
}

/// One event as exposed to the external facade.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event_id: i64,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: String,
    pub version: i64,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsHistory {
    pub aggregate_id: Uuid,
    pub total_events: usize,
    pub events: Vec<EventRecord>,
}

pub struct EventsHistoryHandler {
    store: BankAccountStore,
}

impl EventsHistoryHandler {
    pub fn new(store: BankAccountStore) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: EventsHistoryQuery) -> AppResult<EventsHistory> {
        tracing::info!(aggregate_id = %query.aggregate_id, "GetEventsHistory query");

        let events = self.store.load_events(query.aggregate_id).await?;
        let serializer = BankAccountSerializer;

        let records = events
            .into_iter()
            .map(|event| {
                // Decodability check only; the raw payload is served either way.
                if let Err(e) = serializer.deserialize(&event) {
                    tracing::warn!(
                        event_id = event.event_id,
                        event_type = %event.event_type,
                        error = %e,
                        "event payload not decodable, serving raw data"
                    );
                }
                EventRecord {
                    event_id: event.event_id,
                    aggregate_id: event.aggregate_id,
                    aggregate_type: event.aggregate_type,
                    event_type: event.event_type,
                    version: event.version,
                    data: event.data,
                    metadata: event.metadata,
                    timestamp: event.timestamp,
                }
            })
            .collect::<Vec<_>>();

        Ok(EventsHistory {
            aggregate_id: query.aggregate_id,
            total_events: records.len(),
            events: records,
        })
    }
}
