//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use outbox::{PendingEvent, TrackedAggregate, Version};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the stable discriminant used to route and decode the event.
    fn event_type(&self) -> &'static str;

    /// Returns the unique event ID, used by consumers for deduplication.
    fn event_id(&self) -> Uuid;

    /// Returns when the event happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Identity and timestamp shared by every domain event.
///
/// Only the domain crate can mint new metadata; outside it, metadata only
/// comes from decoding a stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Ordered buffer of events an aggregate has raised but not yet committed.
///
/// Only the owning aggregate appends. Only a successful unit-of-work commit
/// clears it, through [`outbox::TrackedAggregate::mark_committed`].
#[derive(Debug, Clone)]
pub struct EventBuffer<E> {
    events: Vec<E>,
}

impl<E> EventBuffer<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn record(&mut self, event: E) {
        self.events.push(event);
    }

    /// Returns the buffered events in the order they were raised.
    pub fn snapshot(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn flush(&mut self) {
        self.events.clear();
    }
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventBuffer<E> {
    /// Serializes the buffer into outbox-ready events.
    pub(crate) fn to_pending(&self) -> outbox::Result<Vec<PendingEvent>> {
        self.events
            .iter()
            .map(|event| -> outbox::Result<PendingEvent> {
                Ok(PendingEvent {
                    event_type: event.event_type(),
                    content: serde_json::to_string(event)?,
                    occurred_at: event.occurred_at(),
                })
            })
            .collect()
    }
}

/// Trait for aggregate roots.
///
/// An aggregate root is the single entry point for every mutation of its
/// consistency boundary. Mutations change state in memory and append events
/// to the aggregate's own [`EventBuffer`]; persistence goes through
/// [`TrackedAggregate`] and a [`outbox::UnitOfWork`].
pub trait AggregateRoot: TrackedAggregate + Serialize + DeserializeOwned + Sync {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// The type of errors its operations return.
    type Error: std::error::Error + Send + Sync;

    /// Storage discriminant, e.g. `"Product"`.
    const AGGREGATE_TYPE: &'static str;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading state.
    fn set_version(&mut self, version: Version);

    /// Returns the buffered, uncommitted events.
    fn uncommitted_events(&self) -> &[Self::Event];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Renamed {
        #[serde(flatten)]
        metadata: EventMetadata,
        new_name: String,
    }

    impl DomainEvent for Renamed {
        fn event_type(&self) -> &'static str {
            "test.renamed.v1"
        }

        fn event_id(&self) -> Uuid {
            self.metadata.id()
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.metadata.occurred_at()
        }
    }

    fn renamed(name: &str) -> Renamed {
        Renamed {
            metadata: EventMetadata::new(),
            new_name: name.to_string(),
        }
    }

    #[test]
    fn test_buffer_preserves_order() {
        let mut buffer = EventBuffer::new();
        buffer.record(renamed("a"));
        buffer.record(renamed("b"));

        let names: Vec<_> = buffer.snapshot().iter().map(|e| e.new_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_flush_empties_buffer() {
        let mut buffer = EventBuffer::new();
        buffer.record(renamed("a"));
        buffer.flush();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_to_pending_serializes_camel_case_with_metadata() {
        let mut buffer = EventBuffer::new();
        let event = renamed("Widget");
        let id = event.event_id();
        buffer.record(event);

        let pending = buffer.to_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, "test.renamed.v1");

        let json: serde_json::Value = serde_json::from_str(&pending[0].content).unwrap();
        assert_eq!(json["newName"], "Widget");
        assert_eq!(json["id"], id.to_string());
        assert!(json.get("occurredAt").is_some());
    }

    #[test]
    fn test_metadata_ids_are_unique() {
        assert_ne!(EventMetadata::new().id(), EventMetadata::new().id());
    }
}
