//! Fan-out connector tests

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use conflux_component::{ConsumeError, MetricsConsumer, TraceConsumer};
use conflux_telemetry::{Metric, MetricsBatch, Span, TraceBatch};

use super::{MetricsFanOut, TraceFanOut};

struct Counting {
    spans: AtomicU64,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spans: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl TraceConsumer for Counting {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.spans
            .fetch_add(batch.span_count() as u64, Ordering::Relaxed);
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl TraceConsumer for Failing {
    async fn consume_traces(&self, _batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        Err(ConsumeError::export("backend unavailable"))
    }
}

fn batch(spans: usize) -> Arc<TraceBatch> {
    Arc::new(TraceBatch {
        spans: (0..spans).map(|_| Span::default()).collect(),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_delivers_to_every_consumer() {
    let first = Counting::new();
    let second = Counting::new();
    let third = Counting::new();
    let fanout = TraceFanOut::wrap(vec![
        Arc::clone(&first) as Arc<dyn TraceConsumer>,
        Arc::clone(&second) as Arc<dyn TraceConsumer>,
        Arc::clone(&third) as Arc<dyn TraceConsumer>,
    ]);

    fanout.consume_traces(batch(5)).await.unwrap();

    assert_eq!(first.spans.load(Ordering::Relaxed), 5);
    assert_eq!(second.spans.load(Ordering::Relaxed), 5);
    assert_eq!(third.spans.load(Ordering::Relaxed), 5);
}

#[test]
fn test_single_consumer_collapses_to_itself() {
    let only = Counting::new();
    let wrapped = TraceFanOut::wrap(vec![Arc::clone(&only) as Arc<dyn TraceConsumer>]);

    let original: Arc<dyn TraceConsumer> = only;
    assert!(Arc::ptr_eq(&wrapped, &original));
}

#[tokio::test]
async fn test_consumer_error_is_counted_not_propagated() {
    let healthy = Counting::new();
    let fanout = TraceFanOut {
        consumers: vec![
            Arc::new(Failing) as Arc<dyn TraceConsumer>,
            Arc::clone(&healthy) as Arc<dyn TraceConsumer>,
        ],
        drops: AtomicU64::new(0),
    };

    // The failing consumer must not block delivery to the healthy one.
    fanout.consume_traces(batch(2)).await.unwrap();
    fanout.consume_traces(batch(3)).await.unwrap();

    assert_eq!(healthy.spans.load(Ordering::Relaxed), 5);
    assert_eq!(fanout.dropped(), 2);
}

struct CountingMetrics {
    points: AtomicU64,
}

#[async_trait]
impl MetricsConsumer for CountingMetrics {
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        self.points
            .fetch_add(batch.metric_count() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::test]
async fn test_metrics_fan_out() {
    let first = Arc::new(CountingMetrics {
        points: AtomicU64::new(0),
    });
    let second = Arc::new(CountingMetrics {
        points: AtomicU64::new(0),
    });
    let fanout = MetricsFanOut::wrap(vec![
        Arc::clone(&first) as Arc<dyn MetricsConsumer>,
        Arc::clone(&second) as Arc<dyn MetricsConsumer>,
    ]);

    fanout
        .consume_metrics(Arc::new(MetricsBatch {
            metrics: vec![Metric::default()],
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(first.points.load(Ordering::Relaxed), 1);
    assert_eq!(second.points.load(Ordering::Relaxed), 1);
}
