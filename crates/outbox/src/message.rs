use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default retry budget for a new outbox message.
pub const DEFAULT_MAX_RETRY_COUNT: i32 = 3;

/// Upper bound on the stored failure detail, in characters.
pub const MAX_ERROR_LENGTH: usize = 2000;

/// Unique identifier for an outbox message.
///
/// Consumers use it as the idempotency key when deduplicating deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a message ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Version number for an aggregate, used for optimistic concurrency control.
///
/// A freshly created aggregate is at version 0; every successful commit that
/// writes the aggregate moves it forward by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for an aggregate that was never stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) of the first stored revision.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Delivery state of an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Not yet delivered, retry budget left.
    Pending,
    /// Delivered to the sink. Terminal.
    Processed,
    /// Retry budget exhausted. Terminal until an operator re-enqueues it.
    PermanentlyFailed,
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageState::Pending => write!(f, "pending"),
            MessageState::Processed => write!(f, "processed"),
            MessageState::PermanentlyFailed => write!(f, "permanently_failed"),
        }
    }
}

/// A durable record of one domain event awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: MessageId,

    /// Event discriminant used to select a decoder.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Serialized event payload, opaque to the store.
    pub content: String,

    /// Timestamp copied from the source event.
    pub occurred_on: DateTime<Utc>,

    pub processed_on: Option<DateTime<Utc>>,

    /// Last failure detail, bounded to [`MAX_ERROR_LENGTH`] characters.
    pub error: Option<String>,

    pub retry_count: i32,

    pub max_retry_count: i32,

    /// Dispatcher instance currently holding the lease, if any.
    pub locked_by: Option<String>,

    /// Lease deadline; after it passes the message may be claimed again.
    pub locked_until: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Creates a pending message with a fresh ID and the default retry budget.
    pub fn new(
        message_type: impl Into<String>,
        content: impl Into<String>,
        occurred_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            message_type: message_type.into(),
            content: content.into(),
            occurred_on,
            processed_on: None,
            error: None,
            retry_count: 0,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            locked_by: None,
            locked_until: None,
        }
    }

    /// Overrides the retry budget.
    pub fn with_max_retry_count(mut self, max_retry_count: i32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    pub fn is_processed(&self) -> bool {
        self.processed_on.is_some()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retry_count && !self.is_processed()
    }

    pub fn is_permanently_failed(&self) -> bool {
        self.retry_count >= self.max_retry_count && !self.is_processed()
    }

    /// Returns the current delivery state.
    pub fn state(&self) -> MessageState {
        if self.is_processed() {
            MessageState::Processed
        } else if self.is_permanently_failed() {
            MessageState::PermanentlyFailed
        } else {
            MessageState::Pending
        }
    }

    /// Returns true if another dispatcher holds an unexpired lease.
    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Returns true if the message may be claimed by a dispatcher at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.can_retry() && !self.is_leased(now)
    }

    /// Records a successful delivery.
    ///
    /// Has no effect on a message that is not pending.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) {
        if self.state() != MessageState::Pending {
            return;
        }
        self.processed_on = Some(now);
        self.error = None;
        self.release_lease();
    }

    /// Records a failed delivery attempt, consuming one retry.
    ///
    /// Has no effect on a message that is not pending.
    pub fn record_failure(&mut self, error: impl AsRef<str>) {
        if self.state() != MessageState::Pending {
            return;
        }
        self.retry_count += 1;
        self.error = Some(truncate_error(error.as_ref()));
        self.release_lease();
    }

    /// Exhausts the retry budget at once, for failures that retrying cannot fix.
    ///
    /// Has no effect on a message that is not pending.
    pub fn mark_permanently_failed(&mut self, error: impl AsRef<str>) {
        if self.state() != MessageState::Pending {
            return;
        }
        self.retry_count = self.retry_count.max(self.max_retry_count);
        self.error = Some(truncate_error(error.as_ref()));
        self.release_lease();
    }

    /// Grants a lease to `worker_id` until `until`.
    pub fn lease(&mut self, worker_id: impl Into<String>, until: DateTime<Utc>) {
        self.locked_by = Some(worker_id.into());
        self.locked_until = Some(until);
    }

    /// Drops any lease held on the message.
    pub fn release_lease(&mut self) {
        self.locked_by = None;
        self.locked_until = None;
    }
}

/// Computes the deadline of a lease granted at `now`, saturating on overflow.
pub(crate) fn lease_deadline(now: DateTime<Utc>, lease: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|lease| now.checked_add_signed(lease))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn truncate_error(error: &str) -> String {
    match error.char_indices().nth(MAX_ERROR_LENGTH) {
        Some((idx, _)) => error[..idx].to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboxMessage {
        OutboxMessage::new("catalog.product.created.v1", "{}", Utc::now())
    }

    #[test]
    fn message_id_new_creates_unique_ids() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn new_message_is_pending_with_default_budget() {
        let msg = message();
        assert_eq!(msg.state(), MessageState::Pending);
        assert_eq!(msg.retry_count, 0);
        assert_eq!(msg.max_retry_count, DEFAULT_MAX_RETRY_COUNT);
        assert!(msg.can_retry());
        assert!(!msg.is_processed());
        assert!(!msg.is_permanently_failed());
    }

    #[test]
    fn mark_processed_clears_error_and_lease() {
        let mut msg = message();
        msg.record_failure("broker down");
        msg.lease("worker-1", Utc::now());
        let now = Utc::now();

        msg.mark_processed(now);

        assert_eq!(msg.state(), MessageState::Processed);
        assert_eq!(msg.processed_on, Some(now));
        assert!(msg.error.is_none());
        assert!(msg.locked_by.is_none());
        assert!(!msg.can_retry());
    }

    #[test]
    fn failures_exhaust_the_budget() {
        let mut msg = message();
        msg.record_failure("one");
        msg.record_failure("two");
        assert_eq!(msg.state(), MessageState::Pending);

        msg.record_failure("three");
        assert_eq!(msg.retry_count, 3);
        assert_eq!(msg.state(), MessageState::PermanentlyFailed);
        assert_eq!(msg.error.as_deref(), Some("three"));
    }

    #[test]
    fn terminal_states_are_not_left() {
        let mut msg = message().with_max_retry_count(1);
        msg.record_failure("boom");
        assert!(msg.is_permanently_failed());

        msg.record_failure("again");
        msg.mark_processed(Utc::now());
        assert_eq!(msg.retry_count, 1);
        assert_eq!(msg.state(), MessageState::PermanentlyFailed);

        let mut done = message();
        done.mark_processed(Utc::now());
        done.record_failure("late");
        assert_eq!(done.retry_count, 0);
        assert_eq!(done.state(), MessageState::Processed);
    }

    #[test]
    fn permanent_failure_jumps_to_the_end_of_the_budget() {
        let mut msg = message();
        msg.mark_permanently_failed("unknown event type");
        assert_eq!(msg.retry_count, msg.max_retry_count);
        assert_eq!(msg.state(), MessageState::PermanentlyFailed);
    }

    #[test]
    fn error_is_truncated_on_char_boundary() {
        let mut msg = message();
        msg.record_failure("é".repeat(MAX_ERROR_LENGTH + 10));
        assert_eq!(msg.error.unwrap().chars().count(), MAX_ERROR_LENGTH);
    }

    #[test]
    fn lease_blocks_claiming_until_it_expires() {
        let mut msg = message();
        let now = Utc::now();
        msg.lease("worker-1", now + chrono::Duration::seconds(30));

        assert!(msg.is_leased(now));
        assert!(!msg.is_claimable(now));
        assert!(msg.is_claimable(now + chrono::Duration::seconds(31)));
    }

    #[test]
    fn serializes_type_field_name() {
        let msg = message();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "catalog.product.created.v1");
        assert_eq!(json["retry_count"], 0);
    }
}
