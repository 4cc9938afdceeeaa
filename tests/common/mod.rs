//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use eventbank::command::CreateBankAccountCommand;
use eventbank::domain::{BankAccountSerializer, BankAccountStore, Currency};
use eventbank::es::{BusError, Event, EventBus, InMemoryEventBus, InMemoryEventStore};
use eventbank::repository::{AccountRepository, InMemoryAccountRepository, InMemorySearchRepository};

pub const TOPIC_PREFIX: &str = "eventstore";

/// In-memory infrastructure wired the way the binary wires Postgres.
pub struct TestRuntime {
    pub bus: Arc<InMemoryEventBus>,
    pub event_store: Arc<InMemoryEventStore>,
    pub store: BankAccountStore,
    pub repository: Arc<InMemoryAccountRepository>,
    pub search: Arc<InMemorySearchRepository>,
}

pub fn runtime() -> TestRuntime {
    runtime_with_frequency(5)
}

pub fn runtime_with_frequency(snapshot_frequency: i64) -> TestRuntime {
    let bus = Arc::new(InMemoryEventBus::new(TOPIC_PREFIX, 3));
    let event_store = Arc::new(InMemoryEventStore::new(bus.clone()));
    let store = BankAccountStore::new(
        event_store.clone(),
        BankAccountSerializer,
        snapshot_frequency,
    );
    TestRuntime {
        bus,
        event_store,
        store,
        repository: Arc::new(InMemoryAccountRepository::new()),
        search: Arc::new(InMemorySearchRepository::new()),
    }
}

pub fn vnd() -> Currency {
    Currency::new("VND").unwrap()
}

pub fn create_command(aggregate_id: Uuid, balance: i64) -> CreateBankAccountCommand {
    CreateBankAccountCommand {
        aggregate_id,
        email: format!("{}@example.com", aggregate_id.simple()),
        first_name: "Alice".into(),
        last_name: "Nguyen".into(),
        balance,
        currency: vnd(),
        password: "secret-password".into(),
    }
}

/// Bus that refuses every batch, for append-publish atomicity tests.
pub struct FailingEventBus;

#[async_trait]
impl EventBus for FailingEventBus {
    async fn publish(&self, _events: &[Event]) -> Result<(), BusError> {
        Err(BusError::Publish("broker unavailable".into()))
    }
}

/// Poll the read model until the document reaches `version`.
pub async fn wait_for_projection_version(
    repository: &InMemoryAccountRepository,
    aggregate_id: Uuid,
    version: i64,
) {
    for _ in 0..200 {
        if let Some(document) = repository.get_by_aggregate_id(aggregate_id).await.unwrap() {
            if document.version >= version {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "projection for {} did not reach version {}",
        aggregate_id, version
    );
}
