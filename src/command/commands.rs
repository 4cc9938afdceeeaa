//! Command definitions
//!
//! Commands carry the caller's intent plus their own validation; handlers
//! refuse to touch the store until `validate` passes.

use uuid::Uuid;

use crate::domain::Currency;
use crate::error::AppError;

/// Minimum password length accepted at account creation.
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct CreateBankAccountCommand {
    pub aggregate_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
    pub currency: Currency,
    pub password: String,
}

impl CreateBankAccountCommand {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.aggregate_id.is_nil() {
            return Err(AppError::InvalidRequest("aggregate_id is required".into()));
        }
        validate_email(&self.email)?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::InvalidRequest("name is required".into()));
        }
        if self.balance < 0 {
            return Err(AppError::InvalidRequest(format!(
                "initial balance must not be negative, got {}",
                self.balance
            )));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidRequest(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DepositBalanceCommand {
    pub aggregate_id: Uuid,
    pub amount: i64,
    pub payment_id: String,
}

impl DepositBalanceCommand {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_movement(self.aggregate_id, self.amount, &self.payment_id)
    }
}

#[derive(Debug, Clone)]
pub struct WithdrawBalanceCommand {
    pub aggregate_id: Uuid,
    pub amount: i64,
    pub payment_id: String,
}

impl WithdrawBalanceCommand {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_movement(self.aggregate_id, self.amount, &self.payment_id)
    }
}

fn validate_movement(aggregate_id: Uuid, amount: i64, payment_id: &str) -> Result<(), AppError> {
    if aggregate_id.is_nil() {
        return Err(AppError::InvalidRequest("aggregate_id is required".into()));
    }
    if amount <= 0 {
        return Err(AppError::InvalidRequest(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if payment_id.trim().is_empty() {
        return Err(AppError::InvalidRequest("payment_id is required".into()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::InvalidRequest(format!("invalid email: {}", email)));
    }
    Ok(())
}
