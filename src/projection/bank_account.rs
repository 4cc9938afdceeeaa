//! Bank account projection
//!
//! Applies one event at a time to the read model. Creation inserts at
//! version 1; deltas update under the version gate
//! `row.version == event.version - 1`. A duplicate delivery
//! (`event.version <= row.version`) is a no-op; a gap, an out-of-order
//! event, or a missing row triggers a rebuild from the event store, which
//! stays the source of truth.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    BalanceDepositedV1, BalanceWithdrawedV1, BankAccountAggregate, BankAccountCreatedV1,
    BankAccountDocument, BankAccountEvent, BankAccountSerializer, BankAccountStore,
};
use crate::es::{Event, EventSerializer, EventStoreError};
use crate::repository::{AccountRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The delta's predecessor version is not what the row holds.
    #[error("projection version gate failed for aggregate {aggregate_id}: expected stored version {expected}, found {stored}")]
    VersionGate {
        aggregate_id: Uuid,
        expected: i64,
        stored: i64,
    },

    /// A delta arrived before the row exists.
    #[error("projection row missing for aggregate {0}")]
    MissingRow(Uuid),

    /// A creation event carried a version other than 1.
    #[error("creation event for aggregate {aggregate_id} has version {version}, expected 1")]
    InvalidCreateVersion { aggregate_id: Uuid, version: i64 },

    /// Read-model storage fault; surfaced so the message is redelivered.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Event store fault while deserializing or rebuilding.
    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl ProjectionError {
    /// Gate failures are self-healed by a rebuild; faults are not.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            ProjectionError::VersionGate { .. }
                | ProjectionError::MissingRow(_)
                | ProjectionError::InvalidCreateVersion { .. }
        )
    }
}

pub struct BankAccountProjection {
    serializer: BankAccountSerializer,
    repository: Arc<dyn AccountRepository>,
    store: BankAccountStore,
}

impl BankAccountProjection {
    pub fn new(repository: Arc<dyn AccountRepository>, store: BankAccountStore) -> Self {
        Self {
            serializer: BankAccountSerializer,
            repository,
            store,
        }
    }

    /// Apply one event, rebuilding the row when the version gate fails.
    pub async fn handle(&self, event: &Event) -> Result<(), ProjectionError> {
        match self.when(event).await {
            Ok(()) => Ok(()),
            Err(e) if e.requires_rebuild() => {
                tracing::warn!(
                    aggregate_id = %event.aggregate_id,
                    version = event.version,
                    error = %e,
                    "projection out of sync, rebuilding from event store"
                );
                self.rebuild(event.aggregate_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Dispatch one event into the read model without self-healing.
    pub async fn when(&self, event: &Event) -> Result<(), ProjectionError> {
        match self.serializer.deserialize(event)? {
            BankAccountEvent::Created(payload) => self.on_created(event, &payload).await,
            BankAccountEvent::Deposited(payload) => self.on_deposited(event, &payload).await,
            BankAccountEvent::Withdrawed(payload) => self.on_withdrawn(event, &payload).await,
        }
    }

    /// Delete the row and reinsert the authoritative state from the log.
    pub async fn rebuild(&self, aggregate_id: Uuid) -> Result<(), ProjectionError> {
        self.repository.delete_by_aggregate_id(aggregate_id).await?;

        let mut aggregate = BankAccountAggregate::new(aggregate_id);
        self.store.load(&mut aggregate).await?;
        if aggregate.version() == 0 {
            tracing::warn!(aggregate_id = %aggregate_id, "no events for aggregate, projection row removed");
            return Ok(());
        }

        let document = BankAccountDocument::from_aggregate(&aggregate);
        self.repository.insert(&document).await?;

        tracing::info!(
            aggregate_id = %aggregate_id,
            version = document.version,
            "projection rebuilt"
        );
        Ok(())
    }

    async fn on_created(
        &self,
        event: &Event,
        payload: &BankAccountCreatedV1,
    ) -> Result<(), ProjectionError> {
        if event.version != 1 {
            return Err(ProjectionError::InvalidCreateVersion {
                aggregate_id: event.aggregate_id,
                version: event.version,
            });
        }

        let now = Utc::now();
        let document = BankAccountDocument {
            aggregate_id: event.aggregate_id,
            version: event.version,
            email: payload.email.clone(),
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            balance: payload.balance.clone(),
            password_hash: payload.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };

        match self.repository.insert(&document).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::DuplicateKey(_)) => {
                tracing::info!(aggregate_id = %event.aggregate_id, "duplicate creation event, idempotent replay");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn on_deposited(
        &self,
        event: &Event,
        payload: &BalanceDepositedV1,
    ) -> Result<(), ProjectionError> {
        let amount = payload.amount;
        self.apply_delta(event, move |document| {
            document.balance.amount += amount;
        })
        .await
    }

    async fn on_withdrawn(
        &self,
        event: &Event,
        payload: &BalanceWithdrawedV1,
    ) -> Result<(), ProjectionError> {
        let amount = payload.amount;
        self.apply_delta(event, move |document| {
            document.balance.amount -= amount;
        })
        .await
    }

    async fn apply_delta(
        &self,
        event: &Event,
        delta: impl Fn(&mut BankAccountDocument) + Send + Sync,
    ) -> Result<(), ProjectionError> {
        let expected = event.version - 1;
        let version = event.version;

        let result = self
            .repository
            .update_concurrently(event.aggregate_id, expected, &|document| {
                delta(document);
                document.version = version;
                document.updated_at = Utc::now();
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(RepositoryError::VersionConflict { stored, .. }) if stored >= event.version => {
                tracing::info!(
                    aggregate_id = %event.aggregate_id,
                    version = event.version,
                    stored,
                    "duplicate delivery, already applied"
                );
                Ok(())
            }
            Err(RepositoryError::VersionConflict {
                aggregate_id,
                expected,
                stored,
            }) => Err(ProjectionError::VersionGate {
                aggregate_id,
                expected,
                stored,
            }),
            Err(RepositoryError::NotFound(id)) => Err(ProjectionError::MissingRow(id)),
            Err(e) => Err(e.into()),
        }
    }
}
