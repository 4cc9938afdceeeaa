//! Point-in-time query
//!
//! Reconstructs the account as of a past version from the nearest snapshot
//! plus the event range. Requesting a version beyond the aggregate's history
//! is `NotFound`.

use uuid::Uuid;

use crate::domain::{BankAccountAggregate, BankAccountDocument, BankAccountStore};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct GetByVersionQuery {
    pub aggregate_id: Uuid,
    pub version: i64,
}

pub struct GetByVersionHandler {
    store: BankAccountStore,
}

impl GetByVersionHandler {
    pub fn new(store: BankAccountStore) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetByVersionQuery) -> AppResult<BankAccountDocument> {
        tracing::info!(aggregate_id = %query.aggregate_id, version = query.version, "GetByVersion query");

        if query.version < 1 {
            return Err(AppError::InvalidRequest(format!(
                "version must be at least 1, got {}",
                query.version
            )));
        }

        let mut aggregate = BankAccountAggregate::new(query.aggregate_id);
        self.store
            .load_by_version(&mut aggregate, query.version)
            .await?;

        if aggregate.version() == 0 {
            return Err(AppError::NotFound(query.aggregate_id));
        }
        // Fewer events than requested: the version does not exist (yet).
        if aggregate.version() < query.version {
            return Err(AppError::NotFound(query.aggregate_id));
        }

        Ok(BankAccountDocument::from_aggregate(&aggregate))
    }
}
