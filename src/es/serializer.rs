//! Serialization registry
//!
//! Maps typed domain events to persisted envelopes and back. Each aggregate
//! type supplies one registry; the `event_type` tag written here is the
//! contract readers dispatch on, so payload schema changes require a new
//! versioned tag rather than editing an existing one.

use super::aggregate::{Aggregate, AggregateState};
use super::error::EventStoreError;
use super::event::Event;

/// Codec registry for one aggregate's event set.
///
/// `serialize` produces an envelope without version (the aggregate store
/// assigns dense per-change versions on save). `deserialize` dispatches on
/// `event_type` and fails with [`EventStoreError::UnknownEventType`] for
/// tags it does not know.
pub trait EventSerializer<S: AggregateState>: Send + Sync {
    fn serialize(
        &self,
        aggregate: &Aggregate<S>,
        event: &S::Event,
    ) -> Result<Event, EventStoreError>;

    fn deserialize(&self, event: &Event) -> Result<S::Event, EventStoreError>;
}
