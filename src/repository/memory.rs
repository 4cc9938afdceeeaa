//! In-memory repositories
//!
//! Hermetic implementations for tests and single-process runs. Maps behind
//! an `RwLock`; the account map's write lock makes `update_concurrently`
//! atomic, mirroring the document store's per-document transaction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{BankAccountDocument, BankAccountSearchDocument};

use super::{AccountRepository, RepositoryError, SearchRepository, UpdateDocument};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    documents: RwLock<HashMap<Uuid, BankAccountDocument>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().expect("account repository poisoned");
        if documents.contains_key(&document.aggregate_id) {
            return Err(RepositoryError::DuplicateKey(document.aggregate_id));
        }
        documents.insert(document.aggregate_id, document.clone());
        Ok(())
    }

    async fn upsert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().expect("account repository poisoned");
        documents.insert(document.aggregate_id, document.clone());
        Ok(())
    }

    async fn update_concurrently(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        update: UpdateDocument<'_>,
    ) -> Result<BankAccountDocument, RepositoryError> {
        let mut documents = self.documents.write().expect("account repository poisoned");
        let document = documents
            .get_mut(&aggregate_id)
            .ok_or(RepositoryError::NotFound(aggregate_id))?;

        if document.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                aggregate_id,
                expected: expected_version,
                stored: document.version,
            });
        }

        update(document);
        Ok(document.clone())
    }

    async fn delete_by_aggregate_id(&self, aggregate_id: Uuid) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().expect("account repository poisoned");
        documents.remove(&aggregate_id);
        Ok(())
    }

    async fn get_by_aggregate_id(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Option<BankAccountDocument>, RepositoryError> {
        let documents = self.documents.read().expect("account repository poisoned");
        Ok(documents.get(&aggregate_id).cloned())
    }

    async fn get_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BankAccountDocument>, RepositoryError> {
        let documents = self.documents.read().expect("account repository poisoned");
        Ok(documents.values().find(|d| d.email == email).cloned())
    }
}

#[derive(Default)]
pub struct InMemorySearchRepository {
    indices: RwLock<HashMap<String, HashMap<Uuid, BankAccountSearchDocument>>>,
}

impl InMemorySearchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in an index.
    pub fn document_count(&self, index: &str) -> usize {
        let indices = self.indices.read().expect("search repository poisoned");
        indices.get(index).map(|docs| docs.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SearchRepository for InMemorySearchRepository {
    async fn create_index(&self, index: &str) -> Result<(), RepositoryError> {
        let mut indices = self.indices.write().expect("search repository poisoned");
        indices.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), RepositoryError> {
        let mut indices = self.indices.write().expect("search repository poisoned");
        indices.remove(index);
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[BankAccountSearchDocument],
    ) -> Result<(), RepositoryError> {
        let mut indices = self.indices.write().expect("search repository poisoned");
        let entry = indices.entry(index.to_string()).or_default();
        for document in documents {
            entry.insert(document.aggregate_id, document.clone());
        }
        Ok(())
    }

    async fn get_document(
        &self,
        index: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<BankAccountSearchDocument>, RepositoryError> {
        let indices = self.indices.read().expect("search repository poisoned");
        Ok(indices
            .get(index)
            .and_then(|docs| docs.get(&aggregate_id))
            .cloned())
    }
}
