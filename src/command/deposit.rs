//! Deposit handler
//!
//! Load -> domain call -> Save, retrying a bounded number of times from Load
//! when another writer wins the optimistic check.

use crate::domain::{BankAccountAggregate, BankAccountStore};
use crate::error::{AppError, AppResult};

use super::commands::DepositBalanceCommand;
use super::{retry_backoff, MAX_RETRIES};

pub struct DepositBalanceHandler {
    store: BankAccountStore,
}

impl DepositBalanceHandler {
    pub fn new(store: BankAccountStore) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: DepositBalanceCommand) -> AppResult<()> {
        cmd.validate()?;
        tracing::info!(aggregate_id = %cmd.aggregate_id, amount = cmd.amount, "handling DepositBalanceCommand");

        for attempt in 0..MAX_RETRIES {
            let mut aggregate = BankAccountAggregate::new(cmd.aggregate_id);
            self.store.load(&mut aggregate).await?;
            if aggregate.version() == 0 {
                return Err(AppError::NotFound(cmd.aggregate_id));
            }

            aggregate.deposit_balance(cmd.amount, &cmd.payment_id)?;

            match self.store.save(&mut aggregate).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_concurrency_conflict() && attempt + 1 < MAX_RETRIES => {
                    tracing::warn!(
                        aggregate_id = %cmd.aggregate_id,
                        attempt = attempt + 1,
                        "concurrency conflict on deposit, retrying from load"
                    );
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal("deposit retries exhausted".into()))
    }
}
