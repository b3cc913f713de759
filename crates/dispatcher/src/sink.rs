//! Delivery targets for decoded events.

use async_trait::async_trait;
use domain::{CatalogEvent, DomainEvent};
use outbox::MessageId;
use thiserror::Error;
use tokio::sync::mpsc;

/// A delivery failure. Every sink error is treated as transient and retried
/// until the message's budget runs out.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Sink channel closed")]
    Closed,
}

/// Downstream consumer of catalog events.
///
/// Delivery is at least once: the same `message_id` may arrive more than
/// once and implementations should deduplicate on it.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, message_id: MessageId, event: &CatalogEvent) -> Result<(), SinkError>;
}

/// Writes every event to the tracing output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl EventSink for LoggingSink {
    async fn deliver(&self, message_id: MessageId, event: &CatalogEvent) -> Result<(), SinkError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| SinkError::Rejected(format!("cannot render payload: {e}")))?;

        tracing::info!(
            message_id = %message_id,
            event_id = %event.event_id(),
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            payload = %payload,
            "Catalog event published"
        );
        Ok(())
    }
}

/// One event handed to a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message_id: MessageId,
    pub event: CatalogEvent,
}

/// Forwards events into a bounded `mpsc` channel.
///
/// Delivery waits for channel capacity, so a slow receiver applies
/// backpressure up to the dispatcher's delivery timeout.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Delivery>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&self, message_id: MessageId, event: &CatalogEvent) -> Result<(), SinkError> {
        self.tx
            .send(Delivery {
                message_id,
                event: event.clone(),
            })
            .await
            .map_err(|_| SinkError::Closed)
    }
}
