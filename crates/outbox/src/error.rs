use thiserror::Error;

use crate::{AggregateId, MessageId, Version};

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The aggregate was modified by someone else since it was loaded.
    #[error(
        "Concurrency conflict for {aggregate_type} {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// An outbox message with the same ID was already stored.
    #[error("Duplicate outbox message: {0}")]
    DuplicateMessage(MessageId),

    /// The change set failed validation before reaching storage.
    #[error("Invalid change set: {0}")]
    InvalidChangeSet(String),

    /// A commit was aborted by an injected fault.
    #[error("Injected fault: {0}")]
    InjectedFault(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
