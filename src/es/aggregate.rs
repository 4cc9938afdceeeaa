//! Aggregate core
//!
//! A generic state machine wrapping domain state: it tracks the version,
//! the uncommitted changes, and drives every transition through the domain's
//! `when` function. Commands call [`Aggregate::apply`]; rehydration calls
//! [`Aggregate::raise`]. The whole core (minus pending changes) serializes
//! into a snapshot.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

use super::event::Snapshot;

/// Domain state that can be folded from events.
///
/// Implementors supply the event set and the `when` transition; the
/// [`Aggregate`] core owns version and change bookkeeping.
pub trait AggregateState:
    Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Closed set of domain events for this aggregate type.
    type Event: Clone + std::fmt::Debug + Send + Sync + 'static;

    /// Storage tag for this aggregate type.
    fn aggregate_type() -> &'static str;

    /// Fold one event into the state. Must be exhaustive over `Event`.
    fn when(&mut self, event: &Self::Event) -> Result<(), DomainError>;
}

/// Generic aggregate root: identity, version, uncommitted changes, and the
/// domain state the events fold into.
///
/// `version` equals the number of applied events; 0 means the aggregate has
/// no history (absent). Instances are exclusively owned by the command or
/// query handling them and are never shared across tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Aggregate<S: AggregateState> {
    id: Uuid,
    version: i64,
    #[serde(skip)]
    changes: Vec<S::Event>,
    state: S,
}

impl<S: AggregateState> Aggregate<S> {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            changes: Vec::new(),
            state: S::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Version of the last applied event; 0 when no events exist.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Transition state and record the event as an uncommitted change.
    pub fn apply(&mut self, event: S::Event) -> Result<(), DomainError> {
        self.state.when(&event)?;
        self.version += 1;
        self.changes.push(event);
        Ok(())
    }

    /// Transition state without recording a change. Used while replaying
    /// persisted events during rehydration.
    pub fn raise(&mut self, event: &S::Event) -> Result<(), DomainError> {
        self.state.when(event)?;
        self.version += 1;
        Ok(())
    }

    /// Uncommitted changes in application order.
    pub fn changes(&self) -> &[S::Event] {
        &self.changes
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    /// Serialize the full state (minus pending changes) at the current
    /// version into an opaque snapshot.
    pub fn to_snapshot(&self) -> Result<Snapshot, serde_json::Error> {
        Ok(Snapshot {
            aggregate_id: self.id,
            aggregate_type: S::aggregate_type().to_string(),
            state: serde_json::to_value(self)?,
            version: self.version,
        })
    }
}

impl<S: AggregateState> std::fmt::Display for Aggregate<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} v{}", S::aggregate_type(), self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Counter {
        total: i64,
    }

    #[derive(Debug, Clone)]
    enum CounterEvent {
        Added(i64),
    }

    impl AggregateState for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn when(&mut self, event: &Self::Event) -> Result<(), DomainError> {
            match event {
                CounterEvent::Added(n) => {
                    self.total += n;
                    Ok(())
                }
            }
        }
    }

    #[test]
    fn test_apply_records_changes_and_bumps_version() {
        let mut aggregate = Aggregate::<Counter>::new(Uuid::new_v4());
        assert_eq!(aggregate.version(), 0);

        aggregate.apply(CounterEvent::Added(2)).unwrap();
        aggregate.apply(CounterEvent::Added(3)).unwrap();

        assert_eq!(aggregate.version(), 2);
        assert_eq!(aggregate.changes().len(), 2);
        assert_eq!(aggregate.state().total, 5);

        aggregate.clear_changes();
        assert!(aggregate.changes().is_empty());
        assert_eq!(aggregate.version(), 2);
    }

    #[test]
    fn test_raise_does_not_record_changes() {
        let mut aggregate = Aggregate::<Counter>::new(Uuid::new_v4());
        aggregate.raise(&CounterEvent::Added(7)).unwrap();

        assert_eq!(aggregate.version(), 1);
        assert!(aggregate.changes().is_empty());
        assert_eq!(aggregate.state().total, 7);
    }

    #[test]
    fn test_snapshot_round_trip_skips_changes() {
        let mut aggregate = Aggregate::<Counter>::new(Uuid::new_v4());
        aggregate.apply(CounterEvent::Added(4)).unwrap();

        let snapshot = aggregate.to_snapshot().unwrap();
        assert_eq!(snapshot.aggregate_id, aggregate.id());
        assert_eq!(snapshot.aggregate_type, "Counter");
        assert_eq!(snapshot.version, 1);

        let restored: Aggregate<Counter> = serde_json::from_value(snapshot.state).unwrap();
        assert_eq!(restored.id(), aggregate.id());
        assert_eq!(restored.version(), 1);
        assert_eq!(restored.state().total, 4);
        assert!(restored.changes().is_empty());
    }
}
