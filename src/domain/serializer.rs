//! Bank account event codec
//!
//! The serialization registry for the bank account event set: writes the
//! exact versioned tags readers dispatch on, fails unknown tags on read.

use crate::es::{Aggregate, AggregateState, Event, EventSerializer, EventStoreError};

use super::bank_account::BankAccount;
use super::events::{
    BankAccountEvent, BALANCE_DEPOSITED_V1, BALANCE_WITHDRAWED_V1, BANK_ACCOUNT_CREATED_V1,
};

#[derive(Debug, Clone, Default)]
pub struct BankAccountSerializer;

impl EventSerializer<BankAccount> for BankAccountSerializer {
    fn serialize(
        &self,
        aggregate: &Aggregate<BankAccount>,
        event: &BankAccountEvent,
    ) -> Result<Event, EventStoreError> {
        let data = match event {
            BankAccountEvent::Created(payload) => serde_json::to_value(payload)?,
            BankAccountEvent::Deposited(payload) => serde_json::to_value(payload)?,
            BankAccountEvent::Withdrawed(payload) => serde_json::to_value(payload)?,
        };

        Ok(Event::new(
            aggregate.id(),
            BankAccount::aggregate_type(),
            event.event_type(),
            data,
            None,
        ))
    }

    fn deserialize(&self, event: &Event) -> Result<BankAccountEvent, EventStoreError> {
        match event.event_type.as_str() {
            BANK_ACCOUNT_CREATED_V1 => Ok(BankAccountEvent::Created(event.get_json_data()?)),
            BALANCE_DEPOSITED_V1 => Ok(BankAccountEvent::Deposited(event.get_json_data()?)),
            BALANCE_WITHDRAWED_V1 => Ok(BankAccountEvent::Withdrawed(event.get_json_data()?)),
            other => Err(EventStoreError::UnknownEventType(other.to_string())),
        }
    }
}
