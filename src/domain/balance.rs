//! Money types
//!
//! Amounts are integer minor currency units (no fractional representation);
//! a balance pairs an amount with the account's fixed currency. Arithmetic
//! is checked: a withdrawal can never drive a balance negative and overflow
//! is rejected rather than wrapped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// 3-letter ISO 4217 currency code.
///
/// The default value is the unset code carried by an account that has not
/// applied its creation event yet; it never appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, DomainError> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            // Round-trips the unset code in snapshot state.
            return Ok(Self(value));
        }
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Account balance in minor units of a single currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: i64,
    pub currency: Currency,
}

impl Balance {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn is_sufficient_for(&self, amount: i64) -> bool {
        self.amount >= amount
    }

    pub fn deposit(&mut self, amount: i64) -> Result<(), DomainError> {
        self.amount = self.amount.checked_add(amount).ok_or(DomainError::Overflow)?;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: i64) -> Result<(), DomainError> {
        if !self.is_sufficient_for(amount) {
            return Err(DomainError::InsufficientBalance {
                requested: amount,
                available: self.amount,
            });
        }
        self.amount -= amount;
        Ok(())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
