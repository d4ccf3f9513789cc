//! Conflux - Exporters
//!
//! Egress components. An exporter instance is shared by reference across
//! every pipeline that lists it; `consume_*` may be called concurrently from
//! many pipeline tasks, and each exporter owns its outbound connections,
//! retries and drop accounting.
//!
//! # Available exporters
//!
//! - **logging** - summarizes batches through `tracing`; `detailed = true`
//!   additionally dumps individual spans and points at debug level
//! - **noop** - drops everything while counting it (benchmarks, smoke tests)
//! - **conflux** - forwards batches to another collector over the framed RPC
//!   wire (collector-to-collector forwarding)

pub mod forwarder;
pub mod logging;
pub mod noop;

pub use forwarder::{ConfluxExporter, ConfluxExporterConfig, ConfluxExporterFactory};
pub use logging::{LoggingExporter, LoggingExporterConfig, LoggingExporterFactory};
pub use noop::{NoopExporter, NoopExporterConfig, NoopExporterFactory};
