//! Consumer traits for the data path
//!
//! Batches move through the graph as `Arc`-shared values so a fan-out node
//! can hand the same allocation to every downstream consumer. `consume_*`
//! may be invoked concurrently from multiple upstream tasks; implementations
//! must be internally safe.

use std::sync::Arc;

use async_trait::async_trait;
use conflux_telemetry::{MetricsBatch, TraceBatch};

use crate::ConsumeError;

/// Receives trace batches from the previous pipeline stage.
#[async_trait]
pub trait TraceConsumer: Send + Sync {
    /// Take ownership of one shared batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch cannot be accepted; fan-out nodes log
    /// it and record a drop rather than propagating upstream.
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError>;
}

/// Receives metrics batches from the previous pipeline stage.
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    /// Take ownership of one shared batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch cannot be accepted; fan-out nodes log
    /// it and record a drop rather than propagating upstream.
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError>;
}
