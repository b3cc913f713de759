//! Transactional outbox storage for the catalog service.
//!
//! Aggregate state and the events it produced are committed in one atomic
//! unit, so a downstream consumer sees an event if and only if the state
//! change that caused it is durable.

pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod record;
pub mod store;
pub mod unit_of_work;

pub use common::AggregateId;
pub use error::{OutboxError, Result};
pub use memory::{CommitFault, InMemoryStore};
pub use message::{
    DEFAULT_MAX_RETRY_COUNT, MAX_ERROR_LENGTH, MessageId, MessageState, OutboxMessage, Version,
};
pub use postgres::PostgresStore;
pub use record::{AggregateRecord, AggregateWrite};
pub use store::{
    AggregateStore, CatalogStore, ChangeSet, OutboxStats, OutboxStore, OutboxStoreExt,
};
pub use unit_of_work::{CommitOutcome, PendingEvent, TrackedAggregate, UnitOfWork};
