use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    AggregateId, AggregateRecord, AggregateWrite, MessageId, OutboxMessage, Result, Version,
    store::{AggregateStore, ChangeSet},
};

/// A buffered domain event, already serialized for the outbox.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    /// Event discriminant, e.g. `catalog.product.created.v1`.
    pub event_type: &'static str,
    /// Serialized event payload.
    pub content: String,
    pub occurred_at: DateTime<Utc>,
}

/// An aggregate whose changes a [`UnitOfWork`] can persist.
///
/// The trait is object safe so a single unit of work can track aggregates
/// of different types.
pub trait TrackedAggregate: Send {
    /// Storage discriminant, e.g. `"Product"`.
    fn aggregate_type(&self) -> &'static str;

    fn aggregate_id(&self) -> AggregateId;

    /// The version the aggregate was loaded at (0 if never stored).
    fn version(&self) -> Version;

    /// Serializes the current state for the aggregate row.
    fn snapshot_state(&self) -> Result<Value>;

    /// Serializes the buffered events in recording order.
    fn pending_events(&self) -> Result<Vec<PendingEvent>>;

    fn has_pending_events(&self) -> bool;

    /// Called after a successful commit: adopt `version` and clear the buffer.
    ///
    /// Only [`UnitOfWork::commit`] calls this in production code, and only
    /// after the store has accepted the change set. Calling it anywhere else
    /// drops buffered events that never reached the outbox.
    fn mark_committed(&mut self, version: Version);
}

/// Result of a successful [`UnitOfWork::commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    /// IDs of the outbox messages written, in commit order.
    pub messages: Vec<MessageId>,
    /// Number of aggregate rows written.
    pub aggregates_written: usize,
}

/// Collects modified aggregates and persists them together with their
/// events in a single atomic commit.
///
/// Aggregates without buffered events are skipped. On failure no aggregate
/// is marked committed, so every event stays buffered.
pub struct UnitOfWork<'a, S: AggregateStore + ?Sized> {
    store: &'a S,
    tracked: Vec<&'a mut dyn TrackedAggregate>,
}

impl<'a, S: AggregateStore + ?Sized> UnitOfWork<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            tracked: Vec::new(),
        }
    }

    /// Registers an aggregate to be persisted on commit.
    pub fn track(&mut self, aggregate: &'a mut dyn TrackedAggregate) -> &mut Self {
        self.tracked.push(aggregate);
        self
    }

    /// Number of tracked aggregates.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Builds the change set the commit would write.
    fn build_change_set(&self) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        for aggregate in self.tracked.iter().filter(|a| a.has_pending_events()) {
            let expected_version = aggregate.version();
            changes.aggregates.push(AggregateWrite {
                expected_version,
                record: AggregateRecord::new(
                    aggregate.aggregate_id(),
                    aggregate.aggregate_type(),
                    expected_version.next(),
                    aggregate.snapshot_state()?,
                ),
            });

            for event in aggregate.pending_events()? {
                changes.messages.push(OutboxMessage::new(
                    event.event_type,
                    event.content,
                    event.occurred_at,
                ));
            }
        }

        Ok(changes)
    }

    /// Commits every tracked aggregate and its buffered events atomically.
    #[tracing::instrument(skip(self), fields(tracked = self.tracked.len()))]
    pub async fn commit(self) -> Result<CommitOutcome> {
        let changes = self.build_change_set()?;
        if changes.is_empty() {
            return Ok(CommitOutcome::default());
        }

        let outcome = CommitOutcome {
            messages: changes.messages.iter().map(|m| m.id).collect(),
            aggregates_written: changes.aggregates.len(),
        };
        let versions: Vec<Version> = changes.aggregates.iter().map(|w| w.record.version).collect();

        self.store.commit(changes).await?;

        let written = self.tracked.into_iter().filter(|a| a.has_pending_events());
        for (aggregate, version) in written.zip(versions) {
            aggregate.mark_committed(version);
        }

        metrics::counter!("outbox_messages_written_total").increment(outcome.messages.len() as u64);
        tracing::debug!(
            messages = outcome.messages.len(),
            aggregates = outcome.aggregates_written,
            "Unit of work committed"
        );

        Ok(outcome)
    }
}
