//! Read model documents
//!
//! Query-optimized shapes derived from events: the account document served
//! by the read-model store, and the search document maintained by the replay
//! service with per-account analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::Balance;
use super::bank_account::BankAccountAggregate;
use super::events::{BalanceDepositedV1, BalanceWithdrawedV1, BankAccountCreatedV1};

/// Account projection held in the read-model store.
///
/// `version` is the last event folded in; updates are version-gated by the
/// repository so a stale or out-of-order write can never land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccountDocument {
    pub aggregate_id: Uuid,
    pub version: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Balance,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankAccountDocument {
    /// Project the authoritative aggregate state into the read-model shape.
    pub fn from_aggregate(aggregate: &BankAccountAggregate) -> Self {
        let now = Utc::now();
        let state = aggregate.state();
        Self {
            aggregate_id: aggregate.id(),
            version: aggregate.version(),
            email: state.email.clone(),
            first_name: state.first_name.clone(),
            last_name: state.last_name.clone(),
            balance: state.balance.clone(),
            password_hash: state.password_hash.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Search index document with replay analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccountSearchDocument {
    pub aggregate_id: Uuid,
    pub version: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Balance,
    pub transaction_count: i64,
    pub total_deposits: i64,
    pub total_withdrawals: i64,
    pub last_activity: DateTime<Utc>,
}

impl BankAccountSearchDocument {
    pub fn new(aggregate_id: Uuid) -> Self {
        Self {
            aggregate_id,
            version: 0,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            balance: Balance::default(),
            transaction_count: 0,
            total_deposits: 0,
            total_withdrawals: 0,
            last_activity: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn when_created(
        &mut self,
        event: &BankAccountCreatedV1,
        version: i64,
        timestamp: DateTime<Utc>,
    ) {
        self.email = event.email.clone();
        self.first_name = event.first_name.clone();
        self.last_name = event.last_name.clone();
        self.balance = event.balance.clone();
        self.version = version;
        self.last_activity = timestamp;
    }

    pub fn when_deposited(
        &mut self,
        event: &BalanceDepositedV1,
        version: i64,
        timestamp: DateTime<Utc>,
    ) {
        self.balance.amount += event.amount;
        self.total_deposits += event.amount;
        self.transaction_count += 1;
        self.version = version;
        self.last_activity = timestamp;
    }

    pub fn when_withdrawn(
        &mut self,
        event: &BalanceWithdrawedV1,
        version: i64,
        timestamp: DateTime<Utc>,
    ) {
        self.balance.amount -= event.amount;
        self.total_withdrawals += event.amount;
        self.transaction_count += 1;
        self.version = version;
        self.last_activity = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balance::Currency;

    #[test]
    fn test_from_aggregate() {
        let mut aggregate = BankAccountAggregate::new(Uuid::new_v4());
        aggregate
            .create_account(
                "alice@example.com",
                "Alice",
                "Nguyen",
                1000,
                Currency::new("VND").unwrap(),
                "secret",
            )
            .unwrap();
        aggregate.deposit_balance(500, "p1").unwrap();

        let document = BankAccountDocument::from_aggregate(&aggregate);
        assert_eq!(document.aggregate_id, aggregate.id());
        assert_eq!(document.version, 2);
        assert_eq!(document.balance.amount, 1500);
        assert_eq!(document.email, "alice@example.com");
    }

    #[test]
    fn test_document_hides_password_hash() {
        let mut aggregate = BankAccountAggregate::new(Uuid::new_v4());
        aggregate
            .create_account("a@b.c", "A", "B", 0, Currency::new("VND").unwrap(), "secret")
            .unwrap();

        let document = BankAccountDocument::from_aggregate(&aggregate);
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_search_document_analytics() {
        let mut document = BankAccountSearchDocument::new(Uuid::new_v4());
        let now = Utc::now();

        document.when_created(
            &BankAccountCreatedV1 {
                email: "a@b.c".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                balance: Balance::new(1000, Currency::new("VND").unwrap()),
                password_hash: String::new(),
            },
            1,
            now,
        );
        document.when_deposited(
            &BalanceDepositedV1 {
                amount: 500,
                payment_id: "p1".into(),
            },
            2,
            now,
        );
        document.when_withdrawn(
            &BalanceWithdrawedV1 {
                amount: 200,
                payment_id: "p2".into(),
            },
            3,
            now,
        );

        assert_eq!(document.balance.amount, 1300);
        assert_eq!(document.transaction_count, 2);
        assert_eq!(document.total_deposits, 500);
        assert_eq!(document.total_withdrawals, 200);
        assert_eq!(document.version, 3);
        assert_eq!(document.full_name(), "A B");
    }
}
