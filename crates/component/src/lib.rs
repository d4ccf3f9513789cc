//! Conflux - Component contracts
//!
//! The traits every pipeline component implements, and the one-shot lifecycle
//! state machine guarding their start/stop bodies.
//!
//! # Roles
//!
//! - **Receiver**: ingress, consumes an external wire protocol and emits
//!   in-memory batches into the pipelines referencing it.
//! - **Processor**: pipeline-scoped intermediate stage; consumes trace
//!   batches and forwards (possibly transformed) batches downstream.
//! - **Exporter**: egress, shared across pipelines; forwards batches to a
//!   backend and owns its outbound connections and backpressure.
//!
//! # Lifecycle
//!
//! Every component moves through `CREATED → STARTING → RUNNING → STOPPING →
//! STOPPED` exactly once. Redundant transitions yield the
//! [`ComponentError::AlreadyStarted`] / [`ComponentError::AlreadyStopped`]
//! signals, which callers treat as success rather than failure.

mod component;
mod consumer;
mod error;
mod lifecycle;

pub use component::{Component, Exporter, Host, Processor, Receiver};
pub use consumer::{MetricsConsumer, TraceConsumer};
pub use error::{ComponentError, ConsumeError};
pub use lifecycle::{Lifecycle, State};
