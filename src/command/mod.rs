//! Command handlers
//!
//! Validate -> Load -> invoke the aggregate -> Save. Concurrency conflicts are
//! retried a bounded number of times from Load; every other error surfaces
//! to the caller unchanged.

mod commands;
mod create_account;
mod deposit;
mod withdraw;

pub use commands::{CreateBankAccountCommand, DepositBalanceCommand, WithdrawBalanceCommand};
pub use create_account::CreateBankAccountHandler;
pub use deposit::DepositBalanceHandler;
pub use withdraw::WithdrawBalanceHandler;

use std::time::Duration;

/// Attempts per command before surfacing the conflict.
pub(crate) const MAX_RETRIES: u32 = 3;

pub(crate) fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(50 * (attempt as u64 + 1))
}
