//! Conflux - Processors
//!
//! Pipeline-scoped intermediate stages for trace data. A processor instance
//! belongs to exactly one pipeline (stateful chains are never shared) and
//! forwards to the next stage it was constructed with.
//!
//! # Available processors
//!
//! - **batch** - accumulates spans per emitting node and re-emits them in
//!   larger batches, on a size threshold or a periodic tick
//! - **noop** - forwards batches unchanged; the minimal processor a traces
//!   pipeline can carry

pub mod batch;
pub mod noop;

pub use batch::{BatchProcessor, BatchProcessorConfig, BatchProcessorFactory};
pub use noop::{NoopProcessor, NoopProcessorConfig, NoopProcessorFactory};
