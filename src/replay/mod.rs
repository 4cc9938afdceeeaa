//! Replay service
//!
//! Folds the entire event log into per-account search documents and bulk
//! indexes them. Unknown event types are warnings, not failures: one
//! undecodable event must never abort a full rebuild of the index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{BankAccountEvent, BankAccountSearchDocument, BankAccountSerializer};
use crate::error::AppResult;
use crate::es::{EventSerializer, EventStore};
use crate::repository::SearchRepository;

pub const BANK_ACCOUNT_INDEX: &str = "bank_accounts";

pub struct ReplayService {
    store: Arc<dyn EventStore>,
    search: Arc<dyn SearchRepository>,
    serializer: BankAccountSerializer,
}

/// Outcome of one replay run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub total_events: usize,
    pub processed_events: usize,
    pub created_accounts: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip)]
    pub duration: Duration,
    pub account_summaries: Vec<AccountSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub aggregate_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub balance: i64,
    pub transaction_count: i64,
    pub last_activity: DateTime<Utc>,
}

impl ReplayService {
    pub fn new(store: Arc<dyn EventStore>, search: Arc<dyn SearchRepository>) -> Self {
        Self {
            store,
            search,
            serializer: BankAccountSerializer,
        }
    }

    /// Replay every event into the search index. With `recreate_index` the
    /// target index is dropped and recreated first.
    pub async fn replay_all(&self, recreate_index: bool) -> AppResult<ReplayResult> {
        let started = Instant::now();
        tracing::info!(recreate_index, "starting event replay into search index");

        if recreate_index {
            if let Err(e) = self.search.delete_index(BANK_ACCOUNT_INDEX).await {
                tracing::warn!(error = %e, "could not delete search index (may not exist)");
            }
            self.search.create_index(BANK_ACCOUNT_INDEX).await?;
        }

        let events = self.store.load_all_events().await?;
        let total_events = events.len();
        let mut processed_events = 0;
        let mut errors = Vec::new();
        let mut projections: HashMap<Uuid, BankAccountSearchDocument> = HashMap::new();

        for event in &events {
            let projection = projections
                .entry(event.aggregate_id)
                .or_insert_with(|| BankAccountSearchDocument::new(event.aggregate_id));

            match self.serializer.deserialize(event) {
                Ok(BankAccountEvent::Created(payload)) => {
                    projection.when_created(&payload, event.version, event.timestamp);
                }
                Ok(BankAccountEvent::Deposited(payload)) => {
                    projection.when_deposited(&payload, event.version, event.timestamp);
                }
                Ok(BankAccountEvent::Withdrawed(payload)) => {
                    projection.when_withdrawn(&payload, event.version, event.timestamp);
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = event.event_id,
                        aggregate_id = %event.aggregate_id,
                        event_type = %event.event_type,
                        error = %e,
                        "skipping event during replay"
                    );
                    errors.push(format!(
                        "event {} ({}) for aggregate {}: {}",
                        event.event_id, event.event_type, event.aggregate_id, e
                    ));
                    continue;
                }
            }
            processed_events += 1;
        }

        let documents: Vec<BankAccountSearchDocument> = projections.into_values().collect();
        if !documents.is_empty() {
            self.search.bulk_index(BANK_ACCOUNT_INDEX, &documents).await?;
        }

        let account_summaries = documents
            .iter()
            .map(|doc| AccountSummary {
                aggregate_id: doc.aggregate_id,
                email: doc.email.clone(),
                full_name: doc.full_name(),
                balance: doc.balance.amount,
                transaction_count: doc.transaction_count,
                last_activity: doc.last_activity,
            })
            .collect::<Vec<_>>();

        let result = ReplayResult {
            total_events,
            processed_events,
            created_accounts: documents.len(),
            errors,
            duration: started.elapsed(),
            account_summaries,
        };

        tracing::info!(
            total_events = result.total_events,
            processed_events = result.processed_events,
            created_accounts = result.created_accounts,
            error_count = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "event replay completed"
        );

        Ok(result)
    }

    /// Fetch one replayed document from the search index.
    pub async fn get_account(
        &self,
        aggregate_id: Uuid,
    ) -> AppResult<Option<BankAccountSearchDocument>> {
        Ok(self
            .search
            .get_document(BANK_ACCOUNT_INDEX, aggregate_id)
            .await?)
    }
}
