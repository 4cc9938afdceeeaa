//! Withdraw handler

use crate::domain::{BankAccountAggregate, BankAccountStore};
use crate::error::{AppError, AppResult};

use super::commands::WithdrawBalanceCommand;
use super::{retry_backoff, MAX_RETRIES};

pub struct WithdrawBalanceHandler {
    store: BankAccountStore,
}

impl WithdrawBalanceHandler {
    pub fn new(store: BankAccountStore) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: WithdrawBalanceCommand) -> AppResult<()> {
        cmd.validate()?;
        tracing::info!(aggregate_id = %cmd.aggregate_id, amount = cmd.amount, "handling WithdrawBalanceCommand");

        for attempt in 0..MAX_RETRIES {
            let mut aggregate = BankAccountAggregate::new(cmd.aggregate_id);
            self.store.load(&mut aggregate).await?;
            if aggregate.version() == 0 {
                return Err(AppError::NotFound(cmd.aggregate_id));
            }

            aggregate.withdraw_balance(cmd.amount, &cmd.payment_id)?;

            match self.store.save(&mut aggregate).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_concurrency_conflict() && attempt + 1 < MAX_RETRIES => {
                    tracing::warn!(
                        aggregate_id = %cmd.aggregate_id,
                        attempt = attempt + 1,
                        "concurrency conflict on withdraw, retrying from load"
                    );
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal("withdraw retries exhausted".into()))
    }
}
