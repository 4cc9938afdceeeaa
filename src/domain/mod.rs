//! Bank account domain
//!
//! Money types, the event set, the aggregate and its business rules, the
//! serialization registry, and the read-model document shapes.

pub mod balance;
pub mod bank_account;
pub mod error;
pub mod events;
pub mod read_model;
pub mod serializer;

pub use balance::{Balance, Currency};
pub use bank_account::{
    hash_password, verify_password, BankAccount, BankAccountAggregate,
    BANK_ACCOUNT_AGGREGATE_TYPE,
};
pub use error::DomainError;
pub use events::{
    BalanceDepositedV1, BalanceWithdrawedV1, BankAccountCreatedV1, BankAccountEvent,
    BALANCE_DEPOSITED_V1, BALANCE_WITHDRAWED_V1, BANK_ACCOUNT_CREATED_V1,
};
pub use read_model::{BankAccountDocument, BankAccountSearchDocument};
pub use serializer::BankAccountSerializer;

/// Aggregate store facade specialised for bank accounts.
pub type BankAccountStore = crate::es::AggregateStore<BankAccount, BankAccountSerializer>;
