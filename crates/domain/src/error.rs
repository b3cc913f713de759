//! Domain error types.

use outbox::OutboxError;
use thiserror::Error;

use crate::category::CategoryError;
use crate::product::ProductError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the catalog store.
    #[error("Store error: {0}")]
    Store(#[from] OutboxError),

    /// An invariant of the product aggregate was violated.
    #[error("Product error: {0}")]
    Product(ProductError),

    /// An invariant of the category aggregate was violated.
    #[error("Category error: {0}")]
    Category(CategoryError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Stored state could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
