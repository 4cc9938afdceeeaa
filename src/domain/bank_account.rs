//! Bank account aggregate
//!
//! Domain rules for account creation, deposits and withdrawals. Command
//! methods validate, emit events through the aggregate core, and stay pure
//! in memory; persistence happens in the aggregate store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::es::{Aggregate, AggregateState};

use super::balance::{Balance, Currency};
use super::error::DomainError;
use super::events::{
    BalanceDepositedV1, BalanceWithdrawedV1, BankAccountCreatedV1, BankAccountEvent,
};

pub const BANK_ACCOUNT_AGGREGATE_TYPE: &str = "BankAccount";

/// Bank account state, derived from events only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Balance,
    pub password_hash: String,
}

impl AggregateState for BankAccount {
    type Event = BankAccountEvent;

    fn aggregate_type() -> &'static str {
        BANK_ACCOUNT_AGGREGATE_TYPE
    }

    fn when(&mut self, event: &Self::Event) -> Result<(), DomainError> {
        match event {
            BankAccountEvent::Created(e) => {
                if self.balance.currency.is_set() && self.balance.currency != e.balance.currency {
                    return Err(DomainError::CurrencyMismatch {
                        account: self.balance.currency.clone(),
                        event: e.balance.currency.clone(),
                    });
                }
                self.email = e.email.clone();
                self.first_name = e.first_name.clone();
                self.last_name = e.last_name.clone();
                self.balance = e.balance.clone();
                self.password_hash = e.password_hash.clone();
                Ok(())
            }
            BankAccountEvent::Deposited(e) => self.balance.deposit(e.amount),
            BankAccountEvent::Withdrawed(e) => self.balance.withdraw(e.amount),
        }
    }
}

pub type BankAccountAggregate = Aggregate<BankAccount>;

impl Aggregate<BankAccount> {
    /// Emit the creation event. The caller verifies non-existence through
    /// the store; this method only guards the domain preconditions.
    pub fn create_account(
        &mut self,
        email: &str,
        first_name: &str,
        last_name: &str,
        initial_balance: i64,
        currency: Currency,
        password: &str,
    ) -> Result<(), DomainError> {
        if initial_balance < 0 {
            return Err(DomainError::InvalidAmount(initial_balance));
        }

        self.apply(BankAccountEvent::Created(BankAccountCreatedV1 {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            balance: Balance::new(initial_balance, currency),
            password_hash: hash_password(password),
        }))
    }

    pub fn deposit_balance(&mut self, amount: i64, payment_id: &str) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(amount));
        }

        self.apply(BankAccountEvent::Deposited(BalanceDepositedV1 {
            amount,
            payment_id: payment_id.to_string(),
        }))
    }

    pub fn withdraw_balance(&mut self, amount: i64, payment_id: &str) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(amount));
        }
        if !self.state().balance.is_sufficient_for(amount) {
            return Err(DomainError::InsufficientBalance {
                requested: amount,
                available: self.state().balance.amount,
            });
        }

        self.apply(BankAccountEvent::Withdrawed(BalanceWithdrawedV1 {
            amount,
            payment_id: payment_id.to_string(),
        }))
    }
}

/// Salted SHA-256 digest, stored as `salt$hex`. Verification belongs to the
/// external authentication collaborator; the helper lives here so both sides
/// agree on the format.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match password_hash.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
