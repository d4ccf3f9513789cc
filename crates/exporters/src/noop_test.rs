//! Noop exporter tests

use std::sync::Arc;

use conflux_component::{Component, ComponentError, Host, MetricsConsumer, TraceConsumer};
use conflux_config::ExporterFactory;
use conflux_telemetry::{Metric, MetricsBatch, Span, TraceBatch};
use tokio_util::sync::CancellationToken;

use crate::noop::{NoopExporter, NoopExporterConfig, NoopExporterFactory};

struct NopHost;

impl Host for NopHost {
    fn report_fatal_error(&self, _error: ComponentError) {}
}

#[tokio::test]
async fn test_drops_everything_and_counts() {
    let exporter = NoopExporter::new(&NoopExporterConfig::default());
    exporter
        .start(Arc::new(NopHost), CancellationToken::new())
        .await
        .unwrap();

    exporter
        .consume_traces(Arc::new(TraceBatch {
            spans: vec![Span::default(), Span::default(), Span::default()],
            ..Default::default()
        }))
        .await
        .unwrap();
    exporter
        .consume_metrics(Arc::new(MetricsBatch {
            metrics: vec![Metric::default()],
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(exporter.spans_dropped(), 3);
    assert_eq!(exporter.metrics_dropped(), 1);

    exporter.stop().await.unwrap();
}

#[test]
fn test_factory_default_config_is_enabled() {
    let config = NoopExporterFactory.create_default_config();
    assert!(config.is_enabled());
    assert_eq!(config.type_tag(), "");
}
