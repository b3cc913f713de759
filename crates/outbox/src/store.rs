use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::{AggregateId, AggregateRecord, AggregateWrite, MessageId, OutboxMessage, Result};

/// Everything one unit of work persists: aggregate rows plus outbox rows.
///
/// A change set is committed atomically. Either every aggregate write and
/// every outbox message becomes durable, or none of them does.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub aggregates: Vec<AggregateWrite>,
    pub messages: Vec<OutboxMessage>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty() && self.messages.is_empty()
    }
}

/// Counts of outbox messages per delivery state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct OutboxStats {
    pub pending: u64,
    pub processed: u64,
    pub permanently_failed: u64,
}

/// Write side: aggregate state persistence, atomic with outbox inserts.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Loads the stored state of an aggregate.
    ///
    /// Returns None if the aggregate was never stored.
    async fn load_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<AggregateRecord>>;

    /// Atomically applies a change set.
    ///
    /// Fails with `ConcurrencyConflict` if any aggregate's stored version does
    /// not match its expected version, in which case nothing is written.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Read side: message selection and status bookkeeping for the dispatcher.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Claims up to `limit` deliverable messages for `worker_id`.
    ///
    /// A message is deliverable when it can still be retried and no other
    /// worker holds an unexpired lease on it. Claimed messages are leased
    /// to the caller for `lease` and returned oldest `occurred_on` first.
    async fn claim_pending(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxMessage>>;

    /// Persists the delivery status of the given messages as one unit.
    ///
    /// Only rows still leased by `worker_id` are written; a row whose lease
    /// was taken over by another worker, or that is already processed, is
    /// left untouched. `retry_count` never decreases. Written rows have
    /// their lease released.
    ///
    /// Returns the IDs of the rows that were written.
    async fn save_statuses(
        &self,
        worker_id: &str,
        messages: &[OutboxMessage],
    ) -> Result<Vec<MessageId>>;

    /// Retrieves a single message.
    async fn get_message(&self, id: MessageId) -> Result<Option<OutboxMessage>>;

    /// Lists messages whose retry budget is exhausted, oldest first.
    async fn list_permanently_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// Counts messages per delivery state.
    async fn stats(&self) -> Result<OutboxStats>;
}

/// Extension trait providing convenience methods for outbox stores.
#[async_trait]
pub trait OutboxStoreExt: OutboxStore {
    /// Persists the status of a single message. Returns false if
    /// `worker_id` no longer held its lease.
    async fn save_status(&self, worker_id: &str, message: &OutboxMessage) -> Result<bool> {
        let written = self
            .save_statuses(worker_id, std::slice::from_ref(message))
            .await?;
        Ok(!written.is_empty())
    }
}

impl<T: OutboxStore + ?Sized> OutboxStoreExt for T {}

/// A store serving both the write path and the dispatcher.
pub trait CatalogStore: AggregateStore + OutboxStore {}

impl<T: AggregateStore + OutboxStore + ?Sized> CatalogStore for T {}

/// Validates a change set before it is applied.
pub fn validate_change_set(changes: &ChangeSet) -> Result<()> {
    let mut seen = HashSet::new();
    for write in &changes.aggregates {
        let key = (write.record.aggregate_type.as_str(), write.record.aggregate_id);
        if !seen.insert(key) {
            return Err(crate::OutboxError::InvalidChangeSet(format!(
                "aggregate {} {} appears twice",
                write.record.aggregate_type, write.record.aggregate_id
            )));
        }
        if write.record.version != write.expected_version.next() {
            return Err(crate::OutboxError::InvalidChangeSet(format!(
                "aggregate {} must be written at version {}, got {}",
                write.record.aggregate_id,
                write.expected_version.next(),
                write.record.version
            )));
        }
    }

    let mut ids = HashSet::new();
    for message in &changes.messages {
        if !ids.insert(message.id) {
            return Err(crate::OutboxError::DuplicateMessage(message.id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{OutboxError, Version};

    fn write(id: AggregateId, expected: i64, version: i64) -> AggregateWrite {
        AggregateWrite {
            expected_version: Version::new(expected),
            record: AggregateRecord::new(
                id,
                "Product",
                Version::new(version),
                serde_json::json!({}),
            ),
        }
    }

    #[test]
    fn valid_change_set_passes() {
        let changes = ChangeSet {
            aggregates: vec![write(AggregateId::new(), 0, 1)],
            messages: vec![OutboxMessage::new("t", "{}", Utc::now())],
        };
        assert!(validate_change_set(&changes).is_ok());
    }

    #[test]
    fn rejects_version_gap() {
        let changes = ChangeSet {
            aggregates: vec![write(AggregateId::new(), 1, 3)],
            messages: vec![],
        };
        assert!(matches!(
            validate_change_set(&changes),
            Err(OutboxError::InvalidChangeSet(_))
        ));
    }

    #[test]
    fn rejects_same_aggregate_twice() {
        let id = AggregateId::new();
        let changes = ChangeSet {
            aggregates: vec![write(id, 0, 1), write(id, 0, 1)],
            messages: vec![],
        };
        assert!(validate_change_set(&changes).is_err());
    }

    #[test]
    fn rejects_duplicate_message_ids() {
        let msg = OutboxMessage::new("t", "{}", Utc::now());
        let changes = ChangeSet {
            aggregates: vec![],
            messages: vec![msg.clone(), msg],
        };
        assert!(matches!(
            validate_change_set(&changes),
            Err(OutboxError::DuplicateMessage(_))
        ));
    }

    #[test]
    fn empty_change_set() {
        assert!(ChangeSet::new().is_empty());
    }
}
