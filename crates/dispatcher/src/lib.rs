//! Outbox dispatcher for catalog events.
//!
//! This crate provides the delivery side of the transactional outbox:
//! - [`EventRegistry`] resolving a message type to a typed decoder
//! - [`EventSink`] with [`LoggingSink`] and [`ChannelSink`]
//! - [`OutboxDispatcher`], which claims pending messages, delivers them and
//!   records the outcome, either once per call or as a background task

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod sink;

pub use config::{CommitMode, DecodeFailurePolicy, DispatcherConfig, InvalidSetting};
pub use dispatcher::{CycleReport, DispatcherHandle, OutboxDispatcher};
pub use error::{DispatchError, Result};
pub use registry::{DecodeError, EventRegistry};
pub use sink::{ChannelSink, Delivery, EventSink, LoggingSink, SinkError};
