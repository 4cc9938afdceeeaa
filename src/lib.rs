//! eventbank library
//!
//! Event-sourced bank account runtime. The event log is the system of
//! record; aggregates rehydrate from snapshots plus tail events, committed
//! batches publish to a partitioned bus inside the storing transaction, and
//! a projection worker pool maintains a version-gated read model.

pub mod command;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod es;
pub mod projection;
pub mod query;
pub mod replay;
pub mod repository;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorCode};
