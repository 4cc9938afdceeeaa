//! Error handling
//!
//! Surface error type for the command/query runtime. Domain errors are
//! reported verbatim; infrastructure faults keep their cause chains and map
//! to `Internal` at the API boundary.

use uuid::Uuid;

use crate::domain::DomainError;
use crate::es::EventStoreError;
use crate::repository::RepositoryError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bank account not found: {0}")]
    NotFound(Uuid),

    #[error("bank account not found for email: {0}")]
    EmailNotFound(String),

    #[error("bank account already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable codes the external facade maps onto its own status space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    Conflict,
    InvalidArgument,
    Internal,
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) | AppError::EmailNotFound(_) => ErrorCode::NotFound,
            AppError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            AppError::InvalidRequest(_) => ErrorCode::InvalidArgument,

            AppError::Domain(domain_err) => match domain_err {
                DomainError::InvalidAmount(_)
                | DomainError::InsufficientBalance { .. }
                | DomainError::InvalidCurrency(_)
                | DomainError::CurrencyMismatch { .. } => ErrorCode::InvalidArgument,
                DomainError::Overflow => ErrorCode::Internal,
            },

            AppError::EventStore(store_err) => match store_err {
                EventStoreError::ConcurrencyConflict { .. } => ErrorCode::Conflict,
                EventStoreError::Domain(_) => ErrorCode::InvalidArgument,
                _ => ErrorCode::Internal,
            },

            AppError::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound(_) => ErrorCode::NotFound,
                RepositoryError::DuplicateKey(_) | RepositoryError::VersionConflict { .. } => {
                    ErrorCode::Conflict
                }
                _ => ErrorCode::Internal,
            },

            AppError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the caller may retry the whole command from `Load`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::EventStore(e) if e.is_retryable())
    }
}
