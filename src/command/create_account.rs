//! Create account handler

use crate::domain::{BankAccountAggregate, BankAccountStore};
use crate::error::{AppError, AppResult};

use super::commands::CreateBankAccountCommand;

pub struct CreateBankAccountHandler {
    store: BankAccountStore,
}

impl CreateBankAccountHandler {
    pub fn new(store: BankAccountStore) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateBankAccountCommand) -> AppResult<()> {
        cmd.validate()?;
        tracing::info!(aggregate_id = %cmd.aggregate_id, "handling CreateBankAccountCommand");

        if self.store.exists(cmd.aggregate_id).await? {
            return Err(AppError::AlreadyExists(cmd.aggregate_id));
        }

        // A fresh aggregate at version 0; creation is only valid from there.
        let mut aggregate = BankAccountAggregate::new(cmd.aggregate_id);
        aggregate.create_account(
            &cmd.email,
            &cmd.first_name,
            &cmd.last_name,
            cmd.balance,
            cmd.currency.clone(),
            &cmd.password,
        )?;

        self.store.save(&mut aggregate).await?;
        Ok(())
    }
}
