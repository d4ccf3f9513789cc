//! Noop exporter - drops everything while counting it
//!
//! Useful for benchmarking the pipeline without a backend, and as the sink
//! of smoke tests.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use conflux_component::{
    Component, ComponentError, ConsumeError, Exporter, Host, Lifecycle, MetricsConsumer,
    TraceConsumer,
};
use conflux_config::{ExporterConfig, ExporterFactory, ExporterSettings, Factory, FactoryError};
use conflux_telemetry::{MetricsBatch, TraceBatch};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Type tag of the noop exporter
const TYPE_TAG: &str = "noop";

/// Configuration for the noop exporter. Only the common settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoopExporterConfig {
    /// Common exporter settings
    #[serde(flatten)]
    pub settings: ExporterSettings,
}

impl ExporterConfig for NoopExporterConfig {
    fn settings(&self) -> &ExporterSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ExporterSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The noop exporter.
#[derive(Debug)]
pub struct NoopExporter {
    name: String,
    lifecycle: Lifecycle,
    spans_dropped: AtomicU64,
    metrics_dropped: AtomicU64,
}

impl NoopExporter {
    /// Create a noop exporter
    pub fn new(config: &NoopExporterConfig) -> Self {
        Self {
            name: if config.settings.name.is_empty() {
                TYPE_TAG.to_string()
            } else {
                config.settings.name.clone()
            },
            lifecycle: Lifecycle::new(),
            spans_dropped: AtomicU64::new(0),
            metrics_dropped: AtomicU64::new(0),
        }
    }

    /// Total spans dropped so far
    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }

    /// Total metric points dropped so far
    pub fn metrics_dropped(&self) -> u64 {
        self.metrics_dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Component for NoopExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        _host: Arc<dyn Host>,
        _cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;
        self.lifecycle.start_succeeded();
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for NoopExporter {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.spans_dropped
            .fetch_add(batch.span_count() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl MetricsConsumer for NoopExporter {
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        self.metrics_dropped
            .fetch_add(batch.metric_count() as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl Exporter for NoopExporter {}

/// Factory for the noop exporter.
pub struct NoopExporterFactory;

impl Factory for NoopExporterFactory {
    fn type_tag(&self) -> &'static str {
        TYPE_TAG
    }
}

impl ExporterFactory for NoopExporterFactory {
    fn create_default_config(&self) -> Box<dyn ExporterConfig> {
        Box::new(NoopExporterConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ExporterConfig>, toml::de::Error> {
        Ok(Box::new(fragment.clone().try_into::<NoopExporterConfig>()?))
    }

    fn create_exporter(
        &self,
        config: &dyn ExporterConfig,
    ) -> Result<Arc<dyn Exporter>, FactoryError> {
        let config = config
            .as_any()
            .downcast_ref::<NoopExporterConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(TYPE_TAG, config.name()))?;
        Ok(Arc::new(NoopExporter::new(config)))
    }
}

#[cfg(test)]
#[path = "noop_test.rs"]
mod tests;
