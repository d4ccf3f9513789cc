//! Conflux - Pipeline
//!
//! Translates a validated configuration into a runnable graph and owns its
//! lifecycle.
//!
//! # Architecture
//!
//! ```text
//! [Receivers]              [Pipelines]                  [Exporters]
//!   conflux ──tee──→ processor → processor ──fan-out──→ logging
//!           └─tee──→ processor ─────────────fan-out──→ ┌ logging (shared)
//!                                                      └ conflux/upstream
//! ```
//!
//! # Key design
//!
//! - **Bottom-up build**: exporters first, then each pipeline's processor
//!   chain (tail first), then receivers, so the full sink graph exists
//!   before a receiver can emit its first batch.
//! - **Shared vs owned**: receivers and exporters are shared `Arc` nodes;
//!   processors are owned by exactly one pipeline.
//! - **Arc fan-out**: one allocation per batch, handed to every consumer.
//! - **Deterministic order**: config maps are sorted, so build order, start
//!   order and the rollback order on a failed start are reproducible.

mod builder;
mod error;
mod fanout;
mod service;

pub use builder::build;
pub use error::{PipelineError, Result};
pub use fanout::{MetricsFanOut, TraceFanOut};
pub use service::{BuiltPipeline, Service};
