//! Noop processor tests

use std::sync::Arc;

use async_trait::async_trait;
use conflux_component::{Component, ComponentError, ConsumeError, Host, TraceConsumer};
use conflux_config::ProcessorFactory;
use conflux_telemetry::TraceBatch;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::batch::BatchProcessorConfig;
use crate::noop::{NoopProcessor, NoopProcessorConfig, NoopProcessorFactory};

struct Collecting {
    batches: Mutex<Vec<Arc<TraceBatch>>>,
}

#[async_trait]
impl TraceConsumer for Collecting {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.batches.lock().push(batch);
        Ok(())
    }
}

struct NopHost;

impl Host for NopHost {
    fn report_fatal_error(&self, _error: ComponentError) {}
}

#[tokio::test]
async fn test_forwards_the_same_allocation() {
    let sink = Arc::new(Collecting {
        batches: Mutex::new(Vec::new()),
    });
    let processor = NoopProcessor::new(
        &NoopProcessorConfig::default(),
        Arc::clone(&sink) as Arc<dyn TraceConsumer>,
    );
    processor
        .start(Arc::new(NopHost), CancellationToken::new())
        .await
        .unwrap();

    let batch = Arc::new(TraceBatch::default());
    processor.consume_traces(Arc::clone(&batch)).await.unwrap();

    let forwarded = sink.batches.lock();
    assert_eq!(forwarded.len(), 1);
    assert!(Arc::ptr_eq(&forwarded[0], &batch));
}

#[tokio::test]
async fn test_lifecycle_is_one_shot() {
    let sink = Arc::new(Collecting {
        batches: Mutex::new(Vec::new()),
    });
    let processor = NoopProcessor::new(&NoopProcessorConfig::default(), sink);
    processor
        .start(Arc::new(NopHost), CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(
        processor
            .start(Arc::new(NopHost), CancellationToken::new())
            .await,
        Err(ComponentError::AlreadyStarted)
    ));

    processor.stop().await.unwrap();
    assert!(matches!(
        processor.stop().await,
        Err(ComponentError::AlreadyStopped)
    ));
}

#[test]
fn test_factory_rejects_mismatched_config() {
    let sink = Arc::new(Collecting {
        batches: Mutex::new(Vec::new()),
    });
    // A config produced by a different factory must be rejected, not misread.
    let config = BatchProcessorConfig::default();
    let err = NoopProcessorFactory
        .create_processor(&config, sink)
        .unwrap_err();
    assert!(err.to_string().contains("mismatched config"));
}

#[test]
fn test_unmarshal_reads_disabled_flag() {
    let fragment: toml::Value = toml::from_str("disabled = true").unwrap();
    let config = NoopProcessorFactory.unmarshal(&fragment).unwrap();
    assert!(!config.is_enabled());
}
