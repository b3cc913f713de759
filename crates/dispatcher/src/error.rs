//! Dispatcher error types.

use thiserror::Error;

/// Errors that abort a dispatch cycle.
///
/// Failures of individual messages never surface here; they are recorded on
/// the message itself.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Claiming messages or persisting their status failed.
    #[error("Outbox store error: {0}")]
    Store(#[from] outbox::OutboxError),
}

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
