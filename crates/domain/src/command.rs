//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use outbox::{AggregateStore, MessageId, UnitOfWork, Version};

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: AggregateRoot> {
    /// The aggregate after the command, with its buffer flushed.
    pub aggregate: A,

    /// The events that were raised and committed to the outbox.
    pub events: Vec<A::Event>,

    /// IDs of the outbox messages written, one per event.
    pub messages: Vec<MessageId>,

    /// The version the aggregate is stored at after the command.
    pub new_version: Version,
}

/// Trait for commands that target an existing aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: AggregateRoot;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate's current state from the store
/// 2. Running the command against it, which fills its event buffer
/// 3. Committing state and events through a unit of work
pub struct CommandHandler<S, A>
where
    S: AggregateStore,
    A: AggregateRoot,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: AggregateStore,
    A: AggregateRoot,
{
    /// Creates a new command handler with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate, failing with `AggregateNotFound` if it was never stored.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load_existing(aggregate_id)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: A::AGGREGATE_TYPE,
                aggregate_id: aggregate_id.to_string(),
            })
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let Some(record) = self
            .store
            .load_aggregate(A::AGGREGATE_TYPE, aggregate_id)
            .await?
        else {
            return Ok(None);
        };

        let mut aggregate: A = record.decode()?;
        aggregate.set_version(record.version);
        Ok(Some(aggregate))
    }

    /// Persists a newly created aggregate together with its creation events.
    pub async fn create(&self, aggregate: A) -> Result<CommandResult<A>, DomainError> {
        self.commit(aggregate).await
    }

    /// Executes a command against a stored aggregate and commits the result.
    ///
    /// The command function mutates the aggregate in place. If it fails,
    /// nothing is written. If it raises no events, nothing is written either
    /// and the aggregate is returned at its current version.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&mut A) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        command_fn(&mut aggregate)?;
        self.commit(aggregate).await
    }

    async fn commit(&self, mut aggregate: A) -> Result<CommandResult<A>, DomainError> {
        let events = aggregate.uncommitted_events().to_vec();

        let mut uow = UnitOfWork::new(&self.store);
        uow.track(&mut aggregate);
        let outcome = uow.commit().await?;

        let new_version = aggregate.version();
        Ok(CommandResult {
            aggregate,
            events,
            messages: outcome.messages,
            new_version,
        })
    }
}
