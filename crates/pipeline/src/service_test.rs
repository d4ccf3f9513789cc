//! Service runtime tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conflux_component::{
    Component, ComponentError, ConsumeError, Exporter, Host, Lifecycle, MetricsConsumer,
    Processor, Receiver, State, TraceConsumer,
};
use conflux_config::DataType;
use conflux_telemetry::{MetricsBatch, TraceBatch};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{BuiltPipeline, Service};
use crate::PipelineError;

type EventLog = Arc<Mutex<Vec<String>>>;

/// One double plays every component role.
struct TestComponent {
    name: String,
    log: EventLog,
    fail_start: bool,
    report_fatal_after_start: bool,
    lifecycle: Lifecycle,
}

impl TestComponent {
    fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            fail_start: false,
            report_fatal_after_start: false,
            lifecycle: Lifecycle::new(),
        })
    }

    fn failing(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            fail_start: true,
            report_fatal_after_start: false,
            lifecycle: Lifecycle::new(),
        })
    }

    fn fatal_reporting(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            fail_start: false,
            report_fatal_after_start: true,
            lifecycle: Lifecycle::new(),
        })
    }
}

#[async_trait]
impl Component for TestComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        host: Arc<dyn Host>,
        _cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;
        self.log.lock().push(format!("start:{}", self.name));

        if self.fail_start {
            self.lifecycle.start_failed();
            return Err(ComponentError::start_failed(&self.name, "induced failure"));
        }

        if self.report_fatal_after_start {
            let name = self.name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                host.report_fatal_error(ComponentError::fatal(name, "induced fatal"));
            });
        }

        self.lifecycle.start_succeeded();
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;
        self.log.lock().push(format!("stop:{}", self.name));
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for TestComponent {
    async fn consume_traces(&self, _batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        Ok(())
    }
}

#[async_trait]
impl MetricsConsumer for TestComponent {
    async fn consume_metrics(&self, _batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        Ok(())
    }
}

impl Exporter for TestComponent {}
impl Processor for TestComponent {}

impl Receiver for TestComponent {
    fn trace_source(&self) -> &'static str {
        "test"
    }

    fn metrics_source(&self) -> &'static str {
        "test"
    }
}

fn service_with(
    exporter: Arc<TestComponent>,
    processors: Vec<Arc<TestComponent>>,
    receiver: Arc<TestComponent>,
) -> Service {
    Service::new(
        vec![("e1".into(), exporter as Arc<dyn Exporter>)],
        vec![BuiltPipeline {
            name: "traces/default".into(),
            input_type: DataType::Traces,
            processors: processors
                .into_iter()
                .enumerate()
                .map(|(i, p)| (format!("p{}", i + 1), p as Arc<dyn Processor>))
                .collect(),
        }],
        vec![("r1".into(), receiver as Arc<dyn Receiver>)],
    )
}

fn events(log: &EventLog) -> Vec<String> {
    log.lock().clone()
}

#[tokio::test]
async fn test_start_and_stop_order() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let service = service_with(
        TestComponent::new("e1", &log),
        vec![TestComponent::new("p1", &log), TestComponent::new("p2", &log)],
        TestComponent::new("r1", &log),
    );

    service.start().await.unwrap();
    assert_eq!(service.state(), State::Running);
    assert_eq!(events(&log), vec!["start:e1", "start:p1", "start:p2", "start:r1"]);

    service.stop().await.unwrap();
    assert_eq!(service.state(), State::Stopped);
    assert_eq!(
        events(&log)[4..],
        ["stop:r1", "stop:p2", "stop:p1", "stop:e1"]
    );
}

#[tokio::test]
async fn test_start_failure_unwinds_in_reverse() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let service = service_with(
        TestComponent::new("e1", &log),
        vec![TestComponent::new("p1", &log), TestComponent::new("p2", &log)],
        TestComponent::failing("r1", &log),
    );

    let err = service.start().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Component(ComponentError::StartFailed { .. })
    ));
    assert!(err.to_string().contains("induced failure"));

    // Everything started before the failure is stopped, newest first.
    assert_eq!(
        events(&log),
        vec![
            "start:e1", "start:p1", "start:p2", "start:r1",
            "stop:p2", "stop:p1", "stop:e1",
        ]
    );

    // A failed start is terminal.
    assert!(matches!(
        service.start().await,
        Err(PipelineError::Component(ComponentError::AlreadyStopped))
    ));
}

#[tokio::test]
async fn test_redundant_start_and_stop_signals() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let service = service_with(
        TestComponent::new("e1", &log),
        vec![TestComponent::new("p1", &log)],
        TestComponent::new("r1", &log),
    );

    service.start().await.unwrap();
    assert!(matches!(
        service.start().await,
        Err(PipelineError::Component(ComponentError::AlreadyStarted))
    ));

    service.stop().await.unwrap();
    for _ in 0..3 {
        assert!(matches!(
            service.stop().await,
            Err(PipelineError::Component(ComponentError::AlreadyStopped))
        ));
    }
}

#[tokio::test]
async fn test_missing_receivers_and_exporters() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    let no_receivers = Service::new(
        vec![("e1".into(), TestComponent::new("e1", &log) as Arc<dyn Exporter>)],
        Vec::new(),
        Vec::new(),
    );
    assert!(matches!(
        no_receivers.start().await,
        Err(PipelineError::MissingReceivers)
    ));

    let no_exporters = Service::new(
        Vec::new(),
        Vec::new(),
        vec![("r1".into(), TestComponent::new("r1", &log) as Arc<dyn Receiver>)],
    );
    assert!(matches!(
        no_exporters.start().await,
        Err(PipelineError::MissingExporters)
    ));
}

#[tokio::test]
async fn test_cancel_before_start_aborts() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let service = service_with(
        TestComponent::new("e1", &log),
        vec![TestComponent::new("p1", &log)],
        TestComponent::new("r1", &log),
    );

    service.cancellation_token().cancel();
    assert!(matches!(
        service.start().await,
        Err(PipelineError::Cancelled)
    ));
    assert!(events(&log).is_empty());
}

#[tokio::test]
async fn test_fatal_error_reaches_the_waiter() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let service = service_with(
        TestComponent::new("e1", &log),
        vec![TestComponent::new("p1", &log)],
        TestComponent::fatal_reporting("r1", &log),
    );

    service.start().await.unwrap();

    let error = tokio::time::timeout(Duration::from_secs(2), service.wait_for_fatal())
        .await
        .expect("fatal error not reported in time");
    assert!(error.to_string().contains("induced fatal"));

    service.stop().await.unwrap();
}
