//! Read-model and search repositories
//!
//! Contracts the core invokes on the external document store and search
//! index, plus the in-memory and Postgres implementations. The account
//! repository's `update_concurrently` is the version gate the projection
//! consumer relies on.

mod memory;
mod pg;

pub use memory::{InMemoryAccountRepository, InMemorySearchRepository};
pub use pg::PgAccountRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{BankAccountDocument, BankAccountSearchDocument};

/// In-place mutation applied inside the repository's version-gated update.
pub type UpdateDocument<'a> = &'a (dyn Fn(&mut BankAccountDocument) + Send + Sync);

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Insert hit an existing document for the same aggregate.
    #[error("document already exists for aggregate {0}")]
    DuplicateKey(Uuid),

    #[error("document not found for aggregate {0}")]
    NotFound(Uuid),

    /// The stored version did not match the expected predecessor.
    #[error("version gate failed for aggregate {aggregate_id}: expected {expected}, stored {stored}")]
    VersionConflict {
        aggregate_id: Uuid,
        expected: i64,
        stored: i64,
    },

    /// A stored document could not be decoded.
    #[error("corrupt stored document: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Document store holding the account read model.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn insert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError>;

    async fn upsert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError>;

    /// Atomically read the document, require `version == expected_version`,
    /// apply `update`, and write back. Fails [`RepositoryError::NotFound`]
    /// on a missing row and [`RepositoryError::VersionConflict`] when the
    /// gate does not hold.
    async fn update_concurrently(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        update: UpdateDocument<'_>,
    ) -> Result<BankAccountDocument, RepositoryError>;

    async fn delete_by_aggregate_id(&self, aggregate_id: Uuid) -> Result<(), RepositoryError>;

    async fn get_by_aggregate_id(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Option<BankAccountDocument>, RepositoryError>;

    async fn get_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BankAccountDocument>, RepositoryError>;
}

/// Search index fed by the replay service.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    async fn create_index(&self, index: &str) -> Result<(), RepositoryError>;

    async fn delete_index(&self, index: &str) -> Result<(), RepositoryError>;

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BankAccountSearchDocument],
    ) -> Result<(), RepositoryError>;

    async fn get_document(
        &self,
        index: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<BankAccountSearchDocument>, RepositoryError>;
}
