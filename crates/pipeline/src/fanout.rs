//! Fan-out connectors
//!
//! A fan-out node writes each item to every one of its outgoing edges. The
//! batch is `Arc`-shared, so fanning out costs one clone of the pointer per
//! consumer. Per-item consumer errors are logged and counted as drops; they
//! never propagate upstream past the fan-out boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use conflux_component::{ConsumeError, MetricsConsumer, TraceConsumer};
use conflux_telemetry::{MetricsBatch, TraceBatch};

/// Fan-out over trace consumers.
pub struct TraceFanOut {
    consumers: Vec<Arc<dyn TraceConsumer>>,
    drops: AtomicU64,
}

impl TraceFanOut {
    /// Wrap a consumer list into a single consumer.
    ///
    /// A single-element list collapses to the consumer itself; the fan-out
    /// node only exists where there is actual fan-out.
    pub fn wrap(mut consumers: Vec<Arc<dyn TraceConsumer>>) -> Arc<dyn TraceConsumer> {
        if consumers.len() == 1 {
            return consumers.remove(0);
        }
        Arc::new(Self {
            consumers,
            drops: AtomicU64::new(0),
        })
    }

    /// Batches rejected by a consumer so far
    pub fn dropped(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TraceConsumer for TraceFanOut {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        for consumer in &self.consumers {
            if let Err(error) = consumer.consume_traces(Arc::clone(&batch)).await {
                self.drops.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    %error,
                    spans = batch.span_count(),
                    "fan-out consumer rejected trace batch, dropping"
                );
            }
        }
        Ok(())
    }
}

/// Fan-out over metrics consumers.
pub struct MetricsFanOut {
    consumers: Vec<Arc<dyn MetricsConsumer>>,
    drops: AtomicU64,
}

impl MetricsFanOut {
    /// Wrap a consumer list into a single consumer; see [`TraceFanOut::wrap`].
    pub fn wrap(mut consumers: Vec<Arc<dyn MetricsConsumer>>) -> Arc<dyn MetricsConsumer> {
        if consumers.len() == 1 {
            return consumers.remove(0);
        }
        Arc::new(Self {
            consumers,
            drops: AtomicU64::new(0),
        })
    }

    /// Batches rejected by a consumer so far
    pub fn dropped(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetricsConsumer for MetricsFanOut {
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        for consumer in &self.consumers {
            if let Err(error) = consumer.consume_metrics(Arc::clone(&batch)).await {
                self.drops.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    %error,
                    metrics = batch.metric_count(),
                    "fan-out consumer rejected metrics batch, dropping"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
