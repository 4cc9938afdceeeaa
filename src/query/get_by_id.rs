//! Get-by-id query
//!
//! Fast path reads the read model; a miss rehydrates from the event store
//! and writes the projection back best-effort. `from_event_store` bypasses
//! the read model for an authoritative answer.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{BankAccountAggregate, BankAccountDocument, BankAccountStore};
use crate::error::{AppError, AppResult};
use crate::repository::AccountRepository;

#[derive(Debug, Clone)]
pub struct GetByIdQuery {
    pub aggregate_id: Uuid,
    pub from_event_store: bool,
}

pub struct GetByIdHandler {
    store: BankAccountStore,
    repository: Arc<dyn AccountRepository>,
}

impl GetByIdHandler {
    pub fn new(store: BankAccountStore, repository: Arc<dyn AccountRepository>) -> Self {
        Self { store, repository }
    }

    pub async fn handle(&self, query: GetByIdQuery) -> AppResult<BankAccountDocument> {
        tracing::info!(aggregate_id = %query.aggregate_id, from_event_store = query.from_event_store, "GetById query");

        if query.from_event_store {
            return self.load_from_store(query.aggregate_id).await;
        }

        if let Some(document) = self
            .repository
            .get_by_aggregate_id(query.aggregate_id)
            .await?
        {
            return Ok(document);
        }

        // Read-model miss: the event store is authoritative. Repair the read
        // model while we are here, but never fail the query over it.
        let document = self.load_from_store(query.aggregate_id).await?;
        if let Err(e) = self.repository.upsert(&document).await {
            tracing::warn!(aggregate_id = %query.aggregate_id, error = %e, "read-model write-back failed");
        }
        Ok(document)
    }

    async fn load_from_store(&self, aggregate_id: Uuid) -> AppResult<BankAccountDocument> {
        let mut aggregate = BankAccountAggregate::new(aggregate_id);
        self.store.load(&mut aggregate).await?;
        if aggregate.version() == 0 {
            return Err(AppError::NotFound(aggregate_id));
        }
        Ok(BankAccountDocument::from_aggregate(&aggregate))
    }
}
