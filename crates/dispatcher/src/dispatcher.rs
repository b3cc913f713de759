//! The outbox polling loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::{StreamExt, stream};
use outbox::{MessageState, OutboxMessage, OutboxStore, OutboxStoreExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::Result;
use crate::config::{CommitMode, DecodeFailurePolicy, DispatcherConfig};
use crate::registry::EventRegistry;
use crate::sink::EventSink;

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Messages claimed from the store.
    pub claimed: usize,
    /// Messages delivered and marked processed.
    pub delivered: usize,
    /// Failed attempts that left the message pending.
    pub retried: usize,
    /// Failed attempts that exhausted the message's budget.
    pub permanently_failed: usize,
    /// Per-message status writes that failed; those messages are claimed
    /// again once their lease runs out.
    pub unsaved: usize,
    /// Attempts whose outcome was discarded because another worker had
    /// taken over the message.
    pub lease_lost: usize,
}

/// Whether an attempt's outcome reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Saved {
    Yes,
    /// Deferred to the end-of-cycle batch write.
    Pending,
    LeaseLost,
    Failed,
}

/// Delivers outbox messages to a sink.
///
/// Each cycle claims a batch of pending messages, decodes and delivers them
/// with bounded concurrency and records the outcome on every message. One
/// message failing never affects the others.
pub struct OutboxDispatcher<S> {
    store: S,
    registry: Arc<EventRegistry>,
    sink: Arc<dyn EventSink>,
    config: DispatcherConfig,
}

impl<S> OutboxDispatcher<S>
where
    S: OutboxStore + 'static,
{
    pub fn new(
        store: S,
        registry: Arc<EventRegistry>,
        sink: Arc<dyn EventSink>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            registry,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one claim, deliver and record pass.
    ///
    /// Fails only if claiming fails, or if the batch status write fails in
    /// [`CommitMode::Batch`].
    #[tracing::instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        metrics::counter!("outbox_dispatch_cycles_total").increment(1);

        let claimed = self
            .store
            .claim_pending(
                &self.config.worker_id,
                self.config.batch_size,
                self.config.effective_lease(),
            )
            .await?;

        let mut report = CycleReport {
            claimed: claimed.len(),
            ..CycleReport::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }

        let mut attempts: Vec<(OutboxMessage, Saved)> = stream::iter(claimed)
            .map(|message| self.attempt(message))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        if self.config.commit_mode == CommitMode::Batch {
            let messages: Vec<OutboxMessage> =
                attempts.iter().map(|(message, _)| message.clone()).collect();
            let written = self
                .store
                .save_statuses(&self.config.worker_id, &messages)
                .await?;
            for (message, saved) in &mut attempts {
                *saved = if written.contains(&message.id) {
                    Saved::Yes
                } else {
                    Saved::LeaseLost
                };
            }
        }

        for (message, saved) in &attempts {
            match saved {
                Saved::Yes => {}
                Saved::Failed | Saved::Pending => {
                    report.unsaved += 1;
                    continue;
                }
                Saved::LeaseLost => {
                    tracing::warn!(
                        message_id = %message.id,
                        "lease taken over by another worker, outcome discarded"
                    );
                    report.lease_lost += 1;
                    metrics::counter!("outbox_leases_lost_total").increment(1);
                    continue;
                }
            }
            match message.state() {
                MessageState::Processed => {
                    report.delivered += 1;
                    metrics::counter!("outbox_messages_delivered_total").increment(1);
                }
                MessageState::Pending => {
                    report.retried += 1;
                    metrics::counter!("outbox_delivery_failures_total").increment(1);
                }
                MessageState::PermanentlyFailed => {
                    report.permanently_failed += 1;
                    metrics::counter!("outbox_delivery_failures_total").increment(1);
                    metrics::counter!("outbox_messages_permanently_failed_total").increment(1);
                }
            }
        }

        metrics::histogram!("outbox_dispatch_cycle_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(?report, "dispatch cycle finished");

        Ok(report)
    }

    /// Attempts one message and, in per-message mode, saves its status.
    ///
    /// Returns the updated message and whether its status was persisted.
    /// A message whose lease was taken over is reported as such and its
    /// stored status is left to the new holder.
    #[tracing::instrument(
        skip(self, message),
        fields(
            message_id = %message.id,
            event_type = %message.message_type,
            retry_count = message.retry_count
        )
    )]
    async fn attempt(&self, mut message: OutboxMessage) -> (OutboxMessage, Saved) {
        match self.registry.decode(&message) {
            Err(e) => {
                tracing::warn!(error = %e, "cannot decode outbox message");
                match self.config.decode_failures {
                    DecodeFailurePolicy::Permanent => {
                        message.mark_permanently_failed(e.to_string())
                    }
                    DecodeFailurePolicy::Transient => message.record_failure(e.to_string()),
                }
            }
            Ok(event) => {
                let delivery = tokio::time::timeout(
                    self.config.delivery_timeout,
                    self.sink.deliver(message.id, &event),
                )
                .await;

                match delivery {
                    Ok(Ok(())) => message.mark_processed(Utc::now()),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "delivery failed");
                        message.record_failure(e.to_string());
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout = ?self.config.delivery_timeout,
                            "delivery timed out"
                        );
                        message.record_failure(format!(
                            "delivery timed out after {:?}",
                            self.config.delivery_timeout
                        ));
                    }
                }
            }
        }

        if message.is_permanently_failed() {
            tracing::error!(
                error = message.error.as_deref().unwrap_or_default(),
                "outbox message permanently failed"
            );
        }

        if self.config.commit_mode == CommitMode::Batch {
            return (message, Saved::Pending);
        }

        match self
            .store
            .save_status(&self.config.worker_id, &message)
            .await
        {
            Ok(true) => (message, Saved::Yes),
            Ok(false) => (message, Saved::LeaseLost),
            Err(e) => {
                tracing::error!(error = %e, "failed to save message status");
                (message, Saved::Failed)
            }
        }
    }

    /// Runs cycles on the poll interval until `shutdown` flips to true or
    /// its sender is dropped.
    ///
    /// Shutdown is only observed between cycles. Cycle errors are logged and
    /// the loop carries on with the next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self
            .config
            .poll_interval
            .max(std::time::Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            worker_id = %self.config.worker_id,
            poll_interval = ?period,
            batch_size = self.config.batch_size,
            lease = ?self.config.effective_lease(),
            "Outbox dispatcher started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(report) if report.claimed > 0 => {
                            tracing::info!(
                                claimed = report.claimed,
                                delivered = report.delivered,
                                retried = report.retried,
                                permanently_failed = report.permanently_failed,
                                "Outbox batch dispatched"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "dispatch cycle failed"),
                    }
                }
            }
        }

        tracing::info!(worker_id = %self.config.worker_id, "Outbox dispatcher stopped");
    }

    /// Runs the dispatcher on its own task.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        DispatcherHandle { shutdown, task }
    }
}

/// Controls a dispatcher started with [`OutboxDispatcher::spawn`].
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signals shutdown and waits for the current cycle to finish.
    pub async fn shutdown(self) -> std::result::Result<(), tokio::task::JoinError> {
        // The receiver is gone if the task already ended.
        let _ = self.shutdown.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
