//! Event sourcing runtime
//!
//! The aggregate core, the event/snapshot envelopes, the serialization
//! registry, the event store (Postgres and in-memory), the event bus, and
//! the Load/Save facade that ties them together.

mod aggregate;
mod aggregate_store;
mod bus;
mod error;
mod event;
mod memory;
mod pg_store;
mod serializer;
mod store;

pub use aggregate::{Aggregate, AggregateState};
pub use aggregate_store::{AggregateStore, DEFAULT_SNAPSHOT_FREQUENCY};
pub use bus::{topic_name, BusError, BusMessage, EventBus, InMemoryEventBus};
pub use error::EventStoreError;
pub use event::{Event, Snapshot};
pub use memory::InMemoryEventStore;
pub use pg_store::PgEventStore;
pub use serializer::EventSerializer;
pub use store::EventStore;
