//! Bank account domain events
//!
//! Wire-level payload schemas, one struct per versioned event type. A
//! payload schema change requires a new `_V2` tag and a new struct; existing
//! tags stay decodable forever.

use serde::{Deserialize, Serialize};

use super::balance::Balance;

pub const BANK_ACCOUNT_CREATED_V1: &str = "BANK_ACCOUNT_CREATED_V1";
pub const BALANCE_DEPOSITED_V1: &str = "BALANCE_DEPOSITED_V1";
pub const BALANCE_WITHDRAWED_V1: &str = "BALANCE_WITHDRAWED_V1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccountCreatedV1 {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Balance,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDepositedV1 {
    pub amount: i64,
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceWithdrawedV1 {
    pub amount: i64,
    pub payment_id: String,
}

/// Closed set of bank account events; the aggregate's `when` matches
/// exhaustively over it.
#[derive(Debug, Clone, PartialEq)]
pub enum BankAccountEvent {
    Created(BankAccountCreatedV1),
    Deposited(BalanceDepositedV1),
    Withdrawed(BalanceWithdrawedV1),
}

impl BankAccountEvent {
    /// Versioned wire tag for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            BankAccountEvent::Created(_) => BANK_ACCOUNT_CREATED_V1,
            BankAccountEvent::Deposited(_) => BALANCE_DEPOSITED_V1,
            BankAccountEvent::Withdrawed(_) => BALANCE_WITHDRAWED_V1,
        }
    }
}
