use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, AggregateRecord, MessageId, OutboxError, OutboxMessage, Result, Version,
    message::lease_deadline,
    store::{AggregateStore, ChangeSet, OutboxStats, OutboxStore, validate_change_set},
};

/// Point inside a commit at which an injected fault aborts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFault {
    /// Abort before anything is staged.
    BeforeAggregateWrite,
    /// Abort after the aggregate rows are staged, before the outbox rows are.
    BetweenAggregateAndOutboxWrite,
}

#[derive(Debug, Default)]
struct Faults {
    commit: Option<CommitFault>,
    save_statuses: bool,
}

#[derive(Debug, Default)]
struct Tables {
    aggregates: HashMap<(String, AggregateId), AggregateRecord>,
    messages: Vec<OutboxMessage>,
}

/// In-memory store implementation for tests and local runs.
///
/// Both tables sit behind one lock, so a commit is atomic with respect to
/// every other operation. Writes are staged and only applied once every
/// check has passed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail at the given point.
    pub fn inject_commit_fault(&self, fault: CommitFault) {
        self.lock_faults().commit = Some(fault);
    }

    /// Makes the next `save_statuses` call fail without writing anything.
    pub fn fail_next_status_save(&self) {
        self.lock_faults().save_statuses = true;
    }

    /// Returns the total number of outbox messages stored.
    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }

    /// Returns the number of aggregate rows stored.
    pub async fn aggregate_count(&self) -> usize {
        self.tables.read().await.aggregates.len()
    }

    /// Returns every stored message in insertion order.
    pub async fn messages(&self) -> Vec<OutboxMessage> {
        self.tables.read().await.messages.clone()
    }

    /// Clears all aggregates and messages.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.aggregates.clear();
        tables.messages.clear();
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_commit_fault(&self) -> Option<CommitFault> {
        self.lock_faults().commit.take()
    }

    fn take_save_fault(&self) -> bool {
        std::mem::take(&mut self.lock_faults().save_statuses)
    }
}

#[async_trait]
impl AggregateStore for InMemoryStore {
    async fn load_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<AggregateRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .aggregates
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        validate_change_set(&changes)?;

        let mut tables = self.tables.write().await;
        let fault = self.take_commit_fault();

        if fault == Some(CommitFault::BeforeAggregateWrite) {
            return Err(OutboxError::InjectedFault("before aggregate write"));
        }

        // Stage aggregate rows
        let mut staged = Vec::with_capacity(changes.aggregates.len());
        for write in changes.aggregates {
            let key = (
                write.record.aggregate_type.clone(),
                write.record.aggregate_id,
            );
            let current = tables
                .aggregates
                .get(&key)
                .map(|r| r.version)
                .unwrap_or(Version::initial());

            if current != write.expected_version {
                return Err(OutboxError::ConcurrencyConflict {
                    aggregate_type: write.record.aggregate_type,
                    aggregate_id: write.record.aggregate_id,
                    expected: write.expected_version,
                    actual: current,
                });
            }
            staged.push((key, write.record));
        }

        if fault == Some(CommitFault::BetweenAggregateAndOutboxWrite) {
            return Err(OutboxError::InjectedFault(
                "between aggregate and outbox write",
            ));
        }

        // Stage outbox rows
        for message in &changes.messages {
            if tables.messages.iter().any(|m| m.id == message.id) {
                return Err(OutboxError::DuplicateMessage(message.id));
            }
        }

        tables.aggregates.extend(staged);
        tables.messages.extend(changes.messages);

        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryStore {
    async fn claim_pending(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxMessage>> {
        let now = Utc::now();
        let until = lease_deadline(now, lease);

        let mut tables = self.tables.write().await;
        let mut candidates: Vec<usize> = tables
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_claimable(now))
            .map(|(idx, _)| idx)
            .collect();

        // Stable sort keeps insertion order for equal timestamps
        candidates.sort_by_key(|&idx| tables.messages[idx].occurred_on);
        candidates.truncate(limit);

        let mut claimed = Vec::with_capacity(candidates.len());
        for idx in candidates {
            let message = &mut tables.messages[idx];
            message.lease(worker_id, until);
            claimed.push(message.clone());
        }

        Ok(claimed)
    }

    async fn save_statuses(
        &self,
        worker_id: &str,
        messages: &[OutboxMessage],
    ) -> Result<Vec<MessageId>> {
        let mut tables = self.tables.write().await;

        if self.take_save_fault() {
            return Err(OutboxError::InjectedFault("status save"));
        }

        let mut written = Vec::with_capacity(messages.len());
        for update in messages {
            let Some(stored) = tables.messages.iter_mut().find(|m| m.id == update.id) else {
                tracing::warn!(message_id = %update.id, "status update for unknown message");
                continue;
            };
            if stored.is_processed() || stored.locked_by.as_deref() != Some(worker_id) {
                continue;
            }
            stored.processed_on = update.processed_on;
            stored.error = update.error.clone();
            stored.retry_count = stored.retry_count.max(update.retry_count);
            stored.release_lease();
            written.push(update.id);
        }

        Ok(written)
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let tables = self.tables.read().await;
        Ok(tables.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn list_permanently_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let tables = self.tables.read().await;
        let mut failed: Vec<_> = tables
            .messages
            .iter()
            .filter(|m| m.is_permanently_failed())
            .cloned()
            .collect();
        failed.sort_by_key(|m| m.occurred_on);
        failed.truncate(limit);
        Ok(failed)
    }

    async fn stats(&self) -> Result<OutboxStats> {
        let tables = self.tables.read().await;
        let mut stats = OutboxStats::default();
        for message in &tables.messages {
            if message.is_processed() {
                stats.processed += 1;
            } else if message.is_permanently_failed() {
                stats.permanently_failed += 1;
            } else {
                stats.pending += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration as ChronoDuration};

    use super::*;
    use crate::{AggregateWrite, MessageState};

    const LEASE: Duration = Duration::from_secs(60);

    fn write(id: AggregateId, expected: Version) -> AggregateWrite {
        AggregateWrite {
            expected_version: expected,
            record: AggregateRecord::new(
                id,
                "Product",
                expected.next(),
                serde_json::json!({"name": "Widget"}),
            ),
        }
    }

    fn message_at(occurred_on: DateTime<Utc>) -> OutboxMessage {
        OutboxMessage::new("catalog.product.created.v1", "{}", occurred_on)
    }

    async fn seed(store: &InMemoryStore, messages: Vec<OutboxMessage>) {
        store
            .commit(ChangeSet {
                aggregates: vec![],
                messages,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn commit_writes_aggregate_and_messages() {
        let store = InMemoryStore::new();
        let id = AggregateId::new();

        store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![message_at(Utc::now())],
            })
            .await
            .unwrap();

        let record = store.load_aggregate("Product", id).await.unwrap().unwrap();
        assert_eq!(record.version, Version::first());
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn concurrency_conflict_writes_nothing() {
        let store = InMemoryStore::new();
        let id = AggregateId::new();
        store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![],
            })
            .await
            .unwrap();

        let result = store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![message_at(Utc::now())],
            })
            .await;

        assert!(matches!(
            result,
            Err(OutboxError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn fault_between_writes_rolls_back_both() {
        let store = InMemoryStore::new();
        let id = AggregateId::new();
        store.inject_commit_fault(CommitFault::BetweenAggregateAndOutboxWrite);

        let result = store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![message_at(Utc::now())],
            })
            .await;

        assert!(matches!(result, Err(OutboxError::InjectedFault(_))));
        assert!(store.load_aggregate("Product", id).await.unwrap().is_none());
        assert_eq!(store.message_count().await, 0);

        // The fault is one-shot
        store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![message_at(Utc::now())],
            })
            .await
            .unwrap();
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_message_id_rolls_back_aggregate() {
        let store = InMemoryStore::new();
        let existing = message_at(Utc::now());
        seed(&store, vec![existing.clone()]).await;

        let id = AggregateId::new();
        let result = store
            .commit(ChangeSet {
                aggregates: vec![write(id, Version::initial())],
                messages: vec![existing],
            })
            .await;

        assert!(matches!(result, Err(OutboxError::DuplicateMessage(_))));
        assert_eq!(store.aggregate_count().await, 0);
    }

    #[tokio::test]
    async fn claim_orders_by_occurred_on_and_respects_limit() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let late = message_at(now);
        let early = message_at(now - ChronoDuration::seconds(10));
        let middle = message_at(now - ChronoDuration::seconds(5));
        seed(&store, vec![late.clone(), early.clone(), middle.clone()]).await;

        let claimed = store.claim_pending("w1", 2, LEASE).await.unwrap();

        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].id, early.id);
        assert_eq!(claimed[1].id, middle.id);
        assert_eq!(claimed[0].locked_by.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn leased_messages_are_not_claimed_twice() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        let first = store.claim_pending("w1", 10, LEASE).await.unwrap();
        let second = store.claim_pending("w2", 10, LEASE).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn expired_lease_can_be_reclaimed() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        store
            .claim_pending("w1", 10, Duration::ZERO)
            .await
            .unwrap();
        let reclaimed = store.claim_pending("w2", 10, LEASE).await.unwrap();

        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].locked_by.as_deref(), Some("w2"));
    }

    #[tokio::test]
    async fn save_statuses_updates_and_releases_lease() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        let mut claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        claimed[0].record_failure("sink unavailable");
        store.save_statuses("w1", &claimed).await.unwrap();

        let stored = store.get_message(claimed[0].id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.error.as_deref(), Some("sink unavailable"));
        assert!(stored.locked_by.is_none());
        assert_eq!(stored.state(), MessageState::Pending);
    }

    #[tokio::test]
    async fn processed_rows_are_never_overwritten() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        let mut claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        let stale = claimed[0].clone();
        claimed[0].mark_processed(Utc::now());
        store.save_statuses("w1", &claimed).await.unwrap();

        let mut stale = stale;
        stale.record_failure("late failure report");
        store.save_statuses("w1", &[stale.clone()]).await.unwrap();

        let stored = store.get_message(stale.id).await.unwrap().unwrap();
        assert!(stored.is_processed());
        assert_eq!(stored.retry_count, 0);
    }

    #[tokio::test]
    async fn stale_worker_cannot_overwrite_a_reclaimed_message() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        // w1's lease runs out while its delivery is still in flight
        let mut stale = store.claim_pending("w1", 10, Duration::ZERO).await.unwrap();

        for _ in 0..2 {
            let mut claimed = store.claim_pending("w2", 10, LEASE).await.unwrap();
            assert_eq!(claimed.len(), 1);
            claimed[0].record_failure("broker unavailable");
            let written = store.save_statuses("w2", &claimed).await.unwrap();
            assert_eq!(written, vec![claimed[0].id]);
        }

        stale[0].record_failure("late failure report");
        let written = store.save_statuses("w1", &stale).await.unwrap();
        assert!(written.is_empty());

        let stored = store.get_message(stale[0].id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 2);
        assert_eq!(stored.error.as_deref(), Some("broker unavailable"));
    }

    #[tokio::test]
    async fn retry_count_never_decreases() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        let mut claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        let mut lower = claimed[0].clone();
        claimed[0].record_failure("first");
        claimed[0].record_failure("second");
        store.save_statuses("w1", &claimed).await.unwrap();

        let mut reclaimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        lower.error = Some("out of date".to_string());
        reclaimed[0] = lower;
        store.save_statuses("w1", &reclaimed).await.unwrap();

        let stored = store.get_message(reclaimed[0].id).await.unwrap().unwrap();
        assert_eq!(stored.retry_count, 2);
    }

    #[tokio::test]
    async fn injected_save_fault_writes_nothing() {
        let store = InMemoryStore::new();
        seed(&store, vec![message_at(Utc::now())]).await;

        let mut claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        claimed[0].mark_processed(Utc::now());
        store.fail_next_status_save();

        assert!(store.save_statuses("w1", &claimed).await.is_err());
        let stored = store.get_message(claimed[0].id).await.unwrap().unwrap();
        assert!(!stored.is_processed());
    }

    #[tokio::test]
    async fn permanently_failed_messages_are_listed_and_not_claimed() {
        let store = InMemoryStore::new();
        let mut failed = message_at(Utc::now()).with_max_retry_count(1);
        failed.record_failure("boom");
        let pending = message_at(Utc::now());
        seed(&store, vec![failed.clone(), pending.clone()]).await;

        let listed = store.list_permanently_failed(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, failed.id);

        let claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, pending.id);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.permanently_failed, 1);
        assert_eq!(stats.processed, 0);
    }
}
