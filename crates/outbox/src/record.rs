use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, Version};

/// The persisted state of one aggregate instance.
///
/// Aggregates are stored as a single JSON document per instance, versioned
/// for optimistic concurrency. Rows are never physically deleted; a logically
/// deleted aggregate keeps its row so the outbox history stays resolvable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// The aggregate this row belongs to.
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Product", "Category").
    pub aggregate_type: String,

    /// The version this row is written at.
    pub version: Version,

    /// When the row was last written.
    pub updated_at: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl AggregateRecord {
    /// Creates a new record.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            updated_at: Utc::now(),
            state,
        }
    }

    /// Creates a record by serializing an aggregate's state.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        let state = serde_json::to_value(state)?;
        Ok(Self::new(aggregate_id, aggregate_type, version, state))
    }

    /// Deserializes the stored state.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state.clone())
    }
}

/// One aggregate write inside a change set.
#[derive(Debug, Clone)]
pub struct AggregateWrite {
    /// Version the stored row must currently be at (0 = must not exist).
    pub expected_version: Version,

    /// The row to write; its `version` is `expected_version + 1`.
    pub record: AggregateRecord,
}
