//! Domain errors
//!
//! Business rule violations, independent of the infrastructure layers.
//! These are reported verbatim to the command caller.

use super::balance::Currency;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Amount is zero or negative where a positive amount is required.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Withdrawal would make the balance negative.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    /// Event currency does not match the account's fixed currency.
    #[error("currency mismatch: account holds {account}, event carries {event}")]
    CurrencyMismatch { account: Currency, event: Currency },

    /// Currency code is not a 3-letter ISO code.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Balance arithmetic exceeded the representable range.
    #[error("balance overflow")]
    Overflow,
}
