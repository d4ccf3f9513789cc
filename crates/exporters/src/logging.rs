//! Logging exporter - batch summaries through `tracing`
//!
//! The operator-facing debug exporter: every batch becomes one structured
//! log line. With `detailed = true` each span and metric point is also
//! dumped at debug level.

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

/// Type tag of the logging exporter
const TYPE_TAG: &str = "logging";

/// Configuration for the logging exporter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingExporterConfig {
    /// Common exporter settings
    #[serde(flatten)]
    pub settings: ExporterSettings,

    /// Also dump every span and metric point at debug level
    pub detailed: bool,
}

impl ExporterConfig for LoggingExporterConfig {
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

/// The logging exporter.
#[derive(Debug)]
pub struct LoggingExporter {
    name: String,
    detailed: bool,
    lifecycle: Lifecycle,
    spans_received: AtomicU64,
    metrics_received: AtomicU64,
}

impl LoggingExporter {
    /// Create a logging exporter
    pub fn new(config: &LoggingExporterConfig) -> Self {
        Self {
            name: if config.settings.name.is_empty() {
                TYPE_TAG.to_string()
            } else {
                config.settings.name.clone()
            },
            detailed: config.detailed,
            lifecycle: Lifecycle::new(),
            spans_received: AtomicU64::new(0),
            metrics_received: AtomicU64::new(0),
        }
    }

    /// Total spans consumed so far
    pub fn spans_received(&self) -> u64 {
        self.spans_received.load(Ordering::Relaxed)
    }

    /// Total metric points consumed so far
    pub fn metrics_received(&self) -> u64 {
        self.metrics_received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Component for LoggingExporter {
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
        tracing::info!(
            exporter = %self.name,
            spans = self.spans_received(),
            metrics = self.metrics_received(),
            "logging exporter stopped"
        );
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for LoggingExporter {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.spans_received
            .fetch_add(batch.span_count() as u64, Ordering::Relaxed);

        tracing::info!(
            exporter = %self.name,
            spans = batch.span_count(),
            service = batch.node.as_ref().map(|n| n.service_name.as_str()).unwrap_or(""),
            source = %batch.source_format,
            "trace batch"
        );

        if self.detailed {
            for span in &batch.spans {
                tracing::debug!(
                    exporter = %self.name,
                    trace_id = %span.trace_id,
                    span_id = %span.span_id,
                    name = %span.name,
                    duration_nanos = span.end_unix_nanos.saturating_sub(span.start_unix_nanos),
                    "span"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsConsumer for LoggingExporter {
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        self.metrics_received
            .fetch_add(batch.metric_count() as u64, Ordering::Relaxed);

        tracing::info!(
            exporter = %self.name,
            metrics = batch.metric_count(),
            service = batch.node.as_ref().map(|n| n.service_name.as_str()).unwrap_or(""),
            source = %batch.source_format,
            "metrics batch"
        );

        if self.detailed {
            for metric in &batch.metrics {
                tracing::debug!(
                    exporter = %self.name,
                    name = %metric.name,
                    value = metric.value,
                    "metric"
                );
            }
        }
        Ok(())
    }
}

impl Exporter for LoggingExporter {}

/// Factory for the logging exporter.
pub struct LoggingExporterFactory;

impl Factory for LoggingExporterFactory {
    fn type_tag(&self) -> &'static str {
        TYPE_TAG
    }
}

impl ExporterFactory for LoggingExporterFactory {
    fn create_default_config(&self) -> Box<dyn ExporterConfig> {
        Box::new(LoggingExporterConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ExporterConfig>, toml::de::Error> {
        Ok(Box::new(
            fragment.clone().try_into::<LoggingExporterConfig>()?,
        ))
    }

    fn create_exporter(
        &self,
        config: &dyn ExporterConfig,
    ) -> Result<Arc<dyn Exporter>, FactoryError> {
        let config = config
            .as_any()
            .downcast_ref::<LoggingExporterConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(TYPE_TAG, config.name()))?;
        Ok(Arc::new(LoggingExporter::new(config)))
    }
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
