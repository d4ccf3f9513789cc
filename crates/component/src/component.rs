//! Component and host traits

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ComponentError;
use crate::{MetricsConsumer, TraceConsumer};

/// Runtime handle given to every component at start.
///
/// The only capability the core exposes to components is asynchronous
/// escalation: a fatal error reported here makes the runtime initiate a full
/// shutdown.
pub trait Host: Send + Sync {
    /// Escalate an unrecoverable error observed after start returned.
    fn report_fatal_error(&self, error: ComponentError);
}

/// A startable pipeline component.
#[async_trait]
pub trait Component: Send + Sync {
    /// Identifier used in logs and error reports (the configured full name).
    fn name(&self) -> &str;

    /// Bring the component to the running state.
    ///
    /// `cancel` is owned by the runtime; it fires when startup is aborted or
    /// shutdown begins, and long-lived tasks spawned here should observe it.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` when already starting or running (a signal the
    /// runtime treats as success); any other error fails the start and makes
    /// the runtime unwind previously started components.
    async fn start(
        &self,
        host: Arc<dyn Host>,
        cancel: CancellationToken,
    ) -> Result<(), ComponentError>;

    /// Release resources. Returns only once sub-tasks have wound down.
    ///
    /// # Errors
    ///
    /// `AlreadyStopped` on calls after the first (treated as success by the
    /// runtime); any other error is reported but does not halt teardown of
    /// the remaining components.
    async fn stop(&self) -> Result<(), ComponentError>;
}

/// Ingress component: consumes an external wire protocol, emits in-memory
/// batches. Shared across every pipeline (of a compatible data type) that
/// references it.
pub trait Receiver: Component {
    /// Name of the trace data source this receiver speaks
    fn trace_source(&self) -> &'static str;

    /// Name of the metrics data source this receiver speaks
    fn metrics_source(&self) -> &'static str;
}

/// Intermediate stage, dedicated to exactly one pipeline.
///
/// Processors consume traces: trace batching requires them, while metrics
/// flow from receivers straight to exporters.
pub trait Processor: Component + TraceConsumer {}

/// Egress component, shared by reference across every pipeline that lists it.
pub trait Exporter: Component + TraceConsumer + MetricsConsumer + std::fmt::Debug {}
