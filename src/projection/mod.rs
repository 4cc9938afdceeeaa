//! Projection pipeline
//!
//! Maintains the bank-account read model from the bus: version-gated
//! updates, idempotent duplicate handling, and self-healing rebuilds from
//! the event store whenever the gate detects a gap.

mod bank_account;
mod worker;

pub use bank_account::{BankAccountProjection, ProjectionError};
pub use worker::ProjectionWorkerPool;
