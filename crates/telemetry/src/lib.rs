//! Conflux - Telemetry data model
//!
//! The in-memory representation of the data flowing through the collector:
//! trace batches and metrics batches, plus the wire envelope shared by the
//! RPC protocol, its REST translation, and the forwarding exporter.
//!
//! # Design
//!
//! - **Arc fan-out friendly**: batches are immutable once produced; the
//!   pipeline wraps them in `Arc` and hands the same allocation to every
//!   consumer.
//! - **Serde throughout**: every type serializes to JSON so the REST gateway
//!   and the framed RPC wire carry the exact same shapes.
//! - **No backend formats**: translation to exporter-specific encodings is an
//!   exporter concern, not part of the data model.

mod metric;
mod trace;
pub mod wire;

pub use metric::{Metric, MetricKind, MetricsBatch};
pub use trace::{Node, Span, TraceBatch};
