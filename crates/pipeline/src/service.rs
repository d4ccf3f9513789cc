//! Pipeline runtime - ordered start, fatal-error surfacing, ordered stop
//!
//! Start walks the components in build order (exporters, then every
//! pipeline's processors downstream-first, then receivers); a failure stops
//! the already-started components in reverse and returns the original
//! error. Stop reverses the full order, treats `AlreadyStopped` as success
//! and keeps tearing down past real errors, reporting the first one.

use std::sync::Arc;

use conflux_component::{
    Component, ComponentError, Exporter, Host, Lifecycle, Processor, Receiver, State,
};
use conflux_config::DataType;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// A pipeline as built.
///
/// It owns its processors exclusively; receivers and exporters are shared
/// nodes tracked by the service.
pub struct BuiltPipeline {
    /// Normalized full name
    pub name: String,

    /// Data type the pipeline carries
    pub input_type: DataType,

    /// Owned processors, downstream-first (chain tail first); this is also
    /// their start order
    pub processors: Vec<(String, Arc<dyn Processor>)>,
}

/// Host handle given to every component.
struct ServiceHost {
    fatal_tx: mpsc::UnboundedSender<ComponentError>,
}

impl Host for ServiceHost {
    fn report_fatal_error(&self, error: ComponentError) {
        tracing::error!(%error, "component reported fatal error");
        let _ = self.fatal_tx.send(error);
    }
}

/// The runnable service: every built component plus lifecycle state.
pub struct Service {
    exporters: Vec<(String, Arc<dyn Exporter>)>,
    pipelines: Vec<BuiltPipeline>,
    receivers: Vec<(String, Arc<dyn Receiver>)>,
    host: Arc<ServiceHost>,
    fatal_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ComponentError>>,
    cancel: CancellationToken,
    lifecycle: Lifecycle,
}

impl Service {
    pub(crate) fn new(
        exporters: Vec<(String, Arc<dyn Exporter>)>,
        pipelines: Vec<BuiltPipeline>,
        receivers: Vec<(String, Arc<dyn Receiver>)>,
    ) -> Self {
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        Self {
            exporters,
            pipelines,
            receivers,
            host: Arc::new(ServiceHost { fatal_tx }),
            fatal_rx: tokio::sync::Mutex::new(fatal_rx),
            cancel: CancellationToken::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Token cancelling the whole service; cancelling it mid-start aborts
    /// the remaining component starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of built pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Number of shared exporter instances
    pub fn exporter_count(&self) -> usize {
        self.exporters.len()
    }

    /// Number of receiver instances
    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Current service state
    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    /// Components in build order: exporters, then each pipeline's
    /// processors downstream-first, then receivers.
    fn components(&self) -> Vec<(&str, Arc<dyn Component>)> {
        let mut components: Vec<(&str, Arc<dyn Component>)> = Vec::new();
        for (name, exporter) in &self.exporters {
            components.push((name, Arc::clone(exporter) as Arc<dyn Component>));
        }
        for pipeline in &self.pipelines {
            for (name, processor) in &pipeline.processors {
                components.push((name, Arc::clone(processor) as Arc<dyn Component>));
            }
        }
        for (name, receiver) in &self.receivers {
            components.push((name, Arc::clone(receiver) as Arc<dyn Component>));
        }
        components
    }

    /// Start every component in dependency order.
    ///
    /// # Errors
    ///
    /// `MissingReceivers`/`MissingExporters` when the graph is empty on
    /// either end; otherwise the original error of the first component that
    /// failed, after previously started components were stopped in reverse.
    pub async fn start(&self) -> Result<()> {
        if self.receivers.is_empty() {
            return Err(PipelineError::MissingReceivers);
        }
        if self.exporters.is_empty() {
            return Err(PipelineError::MissingExporters);
        }

        self.lifecycle.begin_start()?;

        let mut started: Vec<(&str, Arc<dyn Component>)> = Vec::new();
        for (name, component) in self.components() {
            if self.cancel.is_cancelled() {
                tracing::warn!("startup cancelled, unwinding");
                self.unwind(&started).await;
                self.lifecycle.start_failed();
                return Err(PipelineError::Cancelled);
            }

            match component
                .start(
                    Arc::clone(&self.host) as Arc<dyn Host>,
                    self.cancel.child_token(),
                )
                .await
            {
                Ok(()) => {
                    tracing::info!(component = name, "started");
                    started.push((name, component));
                }
                Err(error) if error.is_lifecycle_signal() => {
                    // A shared node started through another path; fine.
                    tracing::debug!(component = name, %error, "component already started");
                    started.push((name, component));
                }
                Err(error) => {
                    tracing::error!(component = name, %error, "start failed, unwinding");
                    self.unwind(&started).await;
                    self.lifecycle.start_failed();
                    return Err(error.into());
                }
            }
        }

        self.lifecycle.start_succeeded();
        tracing::info!(
            exporters = self.exporters.len(),
            pipelines = self.pipelines.len(),
            receivers = self.receivers.len(),
            "service running"
        );
        Ok(())
    }

    /// Stop previously started components in reverse order. Errors here are
    /// logged only; the caller gets the original start error.
    async fn unwind(&self, started: &[(&str, Arc<dyn Component>)]) {
        for (name, component) in started.iter().rev() {
            if let Err(error) = component.stop().await {
                if !error.is_lifecycle_signal() {
                    tracing::warn!(component = name, %error, "rollback stop failed");
                }
            }
        }
    }

    /// Stop every component in reverse build order.
    ///
    /// Teardown continues past failures; the first real error is returned.
    /// `AlreadyStopped` from a component counts as success.
    ///
    /// # Errors
    ///
    /// `AlreadyStopped` on calls after the first, or the first component
    /// stop error encountered.
    pub async fn stop(&self) -> Result<()> {
        self.lifecycle.begin_stop()?;
        self.cancel.cancel();

        let mut first_error: Option<ComponentError> = None;
        for (name, component) in self.components().into_iter().rev() {
            match component.stop().await {
                Ok(()) => tracing::info!(component = name, "stopped"),
                Err(error) if error.is_lifecycle_signal() => {}
                Err(error) => {
                    tracing::error!(component = name, %error, "stop failed");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        self.lifecycle.stopped();
        tracing::info!("service stopped");

        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Resolve when any component reports a fatal error through its host.
    /// The caller is expected to initiate shutdown.
    pub async fn wait_for_fatal(&self) -> ComponentError {
        let mut fatal_rx = self.fatal_rx.lock().await;
        match fatal_rx.recv().await {
            Some(error) => error,
            // The sender half lives in self, so recv cannot fail while the
            // service exists; park rather than fabricate an error.
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
