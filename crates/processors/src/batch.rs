//! Batch processor - accumulates spans into larger batches
//!
//! Incoming spans are bucketed by emitting node so re-emitted batches keep
//! their node identity. A bucket is flushed downstream when it reaches
//! `send_batch_size` spans; a background task additionally flushes every
//! `timeout` so quiet nodes do not hold spans indefinitely. Stop drains
//! every bucket before returning.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conflux_component::{
    Component, ComponentError, ConsumeError, Host, Lifecycle, Processor, TraceConsumer,
};
use conflux_config::{
    Factory, FactoryError, ProcessorConfig, ProcessorFactory, ProcessorSettings,
};
use conflux_telemetry::{Node, Span, TraceBatch};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Type tag of the batch processor
const TYPE_TAG: &str = "batch";

/// Default span count that flushes a bucket
const DEFAULT_SEND_BATCH_SIZE: usize = 512;

/// Default interval of the background flush tick
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for the batch processor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchProcessorConfig {
    /// Common processor settings
    #[serde(flatten)]
    pub settings: ProcessorSettings,

    /// Span count at which a bucket is flushed
    pub send_batch_size: usize,

    /// Interval of the background flush tick (e.g. "1s", "200ms")
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BatchProcessorConfig {
    fn default() -> Self {
        Self {
            settings: ProcessorSettings::default(),
            send_batch_size: DEFAULT_SEND_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProcessorConfig for BatchProcessorConfig {
    fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ProcessorSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Spans accumulated for one emitting node.
struct Bucket {
    node: Option<Node>,
    source_format: String,
    spans: Vec<Span>,
}

/// State shared between the consumer path and the background flusher.
struct Inner {
    name: String,
    next: Arc<dyn TraceConsumer>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Inner {
    /// Emit one bucket downstream.
    async fn emit(&self, bucket: Bucket) {
        let batch = TraceBatch {
            node: bucket.node,
            spans: bucket.spans,
            source_format: bucket.source_format,
        };
        if let Err(error) = self.next.consume_traces(Arc::new(batch)).await {
            tracing::warn!(
                processor = %self.name,
                %error,
                "downstream rejected batched spans, dropping"
            );
        }
    }

    /// Drain and emit every bucket.
    async fn flush_all(&self) {
        let drained: Vec<Bucket> = {
            let mut buckets = self.buckets.lock();
            buckets.drain().map(|(_, bucket)| bucket).collect()
        };
        for bucket in drained {
            self.emit(bucket).await;
        }
    }
}

/// The batch processor.
pub struct BatchProcessor {
    name: String,
    send_batch_size: usize,
    timeout: Duration,
    inner: Arc<Inner>,
    lifecycle: Lifecycle,
    shutdown: CancellationToken,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl BatchProcessor {
    /// Create a batch processor forwarding to `next`
    pub fn new(config: &BatchProcessorConfig, next: Arc<dyn TraceConsumer>) -> Self {
        let name = if config.settings.name.is_empty() {
            TYPE_TAG.to_string()
        } else {
            config.settings.name.clone()
        };
        Self {
            inner: Arc::new(Inner {
                name: name.clone(),
                next,
                buckets: Mutex::new(HashMap::new()),
            }),
            name,
            send_batch_size: config.send_batch_size,
            timeout: config.timeout,
            lifecycle: Lifecycle::new(),
            shutdown: CancellationToken::new(),
            flusher: Mutex::new(None),
        }
    }

    fn node_key(node: Option<&Node>) -> String {
        match node {
            Some(node) => format!("{}/{}", node.service_name, node.host_name),
            None => String::new(),
        }
    }
}

#[async_trait]
impl Component for BatchProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        _host: Arc<dyn Host>,
        cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;

        let inner = Arc::clone(&self.inner);
        let shutdown = self.shutdown.clone();
        let timeout = self.timeout;
        let flusher = tokio::spawn(async move {
            let mut tick = tokio::time::interval(timeout);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => inner.flush_all().await,
                }
            }
        });
        *self.flusher.lock() = Some(flusher);

        self.lifecycle.start_succeeded();
        tracing::debug!(
            processor = %self.name,
            send_batch_size = self.send_batch_size,
            timeout_ms = self.timeout.as_millis() as u64,
            "batch processor started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;
        self.shutdown.cancel();

        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            let _ = flusher.await;
        }

        // Drain whatever is still buffered before reporting stopped.
        self.inner.flush_all().await;
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for BatchProcessor {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        let ready: Vec<Bucket> = {
            let mut buckets = self.inner.buckets.lock();
            let key = Self::node_key(batch.node.as_ref());
            let bucket = buckets.entry(key.clone()).or_insert_with(|| Bucket {
                node: batch.node.clone(),
                source_format: batch.source_format.clone(),
                spans: Vec::with_capacity(self.send_batch_size),
            });
            bucket.spans.extend(batch.spans.iter().cloned());

            if bucket.spans.len() >= self.send_batch_size {
                buckets.remove(&key).into_iter().collect()
            } else {
                Vec::new()
            }
        };

        for bucket in ready {
            self.inner.emit(bucket).await;
        }
        Ok(())
    }
}

impl Processor for BatchProcessor {}

/// Factory for the batch processor.
pub struct BatchProcessorFactory;

impl Factory for BatchProcessorFactory {
    fn type_tag(&self) -> &'static str {
        TYPE_TAG
    }
}

impl ProcessorFactory for BatchProcessorFactory {
    fn create_default_config(&self) -> Box<dyn ProcessorConfig> {
        Box::new(BatchProcessorConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ProcessorConfig>, toml::de::Error> {
        Ok(Box::new(
            fragment.clone().try_into::<BatchProcessorConfig>()?,
        ))
    }

    fn create_processor(
        &self,
        config: &dyn ProcessorConfig,
        next: Arc<dyn TraceConsumer>,
    ) -> Result<Arc<dyn Processor>, FactoryError> {
        let name = config.name().to_string();
        let config = config
            .as_any()
            .downcast_ref::<BatchProcessorConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(TYPE_TAG, &name))?;

        if config.send_batch_size == 0 {
            return Err(FactoryError::create(
                TYPE_TAG,
                &name,
                "send_batch_size must be greater than zero",
            ));
        }
        if config.timeout.is_zero() {
            return Err(FactoryError::create(
                TYPE_TAG,
                &name,
                "timeout must be greater than zero",
            ));
        }

        Ok(Arc::new(BatchProcessor::new(config, next)))
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
