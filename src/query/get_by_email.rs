//! Get-by-email query
//!
//! Read-model only: the event store has no email index, so a miss is a miss.

use std::sync::Arc;

use crate::domain::BankAccountDocument;
use crate::error::{AppError, AppResult};
use crate::repository::AccountRepository;

#[derive(Debug, Clone)]
pub struct GetByEmailQuery {
    pub email: String,
}

pub struct GetByEmailHandler {
    repository: Arc<dyn AccountRepository>,
}

impl GetByEmailHandler {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetByEmailQuery) -> AppResult<BankAccountDocument> {
        tracing::info!(email = %query.email, "GetByEmail query");

        self.repository
            .get_by_email(&query.email)
            .await?
            .ok_or(AppError::EmailNotFound(query.email))
    }
}
