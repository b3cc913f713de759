//! Dispatcher configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// How status updates are written back after a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Each message's status is saved as soon as its attempt finishes.
    #[default]
    PerMessage,
    /// All statuses of a cycle are saved together at the end.
    Batch,
}

/// What happens to a message whose type is unknown or whose payload does
/// not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    /// Exhaust the retry budget immediately.
    #[default]
    Permanent,
    /// Count the failure like any delivery failure.
    Transient,
}

/// A setting value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value {value:?} for {setting}")]
pub struct InvalidSetting {
    pub setting: &'static str,
    pub value: String,
}

impl FromStr for CommitMode {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_message" | "per-message" => Ok(CommitMode::PerMessage),
            "batch" => Ok(CommitMode::Batch),
            _ => Err(InvalidSetting {
                setting: "commit mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for DecodeFailurePolicy {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" => Ok(DecodeFailurePolicy::Permanent),
            "transient" => Ok(DecodeFailurePolicy::Transient),
            _ => Err(InvalidSetting {
                setting: "decode failure policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Tuning knobs for an [`crate::OutboxDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Time between cycles.
    pub poll_interval: Duration,
    /// Maximum messages claimed per cycle.
    pub batch_size: usize,
    /// Maximum deliveries in flight within one cycle.
    pub max_concurrency: usize,
    /// Upper bound for a single delivery attempt.
    pub delivery_timeout: Duration,
    /// How long claimed messages stay reserved for this worker. Raised to
    /// the worst-case batch time when shorter, see
    /// [`DispatcherConfig::effective_lease`].
    pub lease_duration: Duration,
    pub commit_mode: CommitMode,
    pub decode_failures: DecodeFailurePolicy,
    /// Identifies this instance in `locked_by`.
    pub worker_id: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 100,
            max_concurrency: 4,
            delivery_timeout: Duration::from_secs(30),
            lease_duration: Duration::from_secs(60),
            commit_mode: CommitMode::default(),
            decode_failures: DecodeFailurePolicy::default(),
            worker_id: format!("dispatcher-{}", uuid::Uuid::new_v4()),
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the claim limit. Zero is raised to one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the in-cycle parallelism. Zero is raised to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    pub fn with_commit_mode(mut self, commit_mode: CommitMode) -> Self {
        self.commit_mode = commit_mode;
        self
    }

    pub fn with_decode_failures(mut self, decode_failures: DecodeFailurePolicy) -> Self {
        self.decode_failures = decode_failures;
        self
    }

    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// The lease requested when claiming.
    ///
    /// A batch runs in `ceil(batch_size / max_concurrency)` waves of at most
    /// `delivery_timeout` each, so the lease is never shorter than that: the
    /// last message of a batch must still be ours when it is attempted.
    pub fn effective_lease(&self) -> Duration {
        let waves = self.batch_size.div_ceil(self.max_concurrency.max(1));
        let worst_case = self
            .delivery_timeout
            .saturating_mul(u32::try_from(waves).unwrap_or(u32::MAX));
        self.lease_duration.max(worst_case)
    }
}
