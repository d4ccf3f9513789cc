//! Conflux receiver - multiplexed trace/metrics ingress
//!
//! One listener on the configured endpoint serves both wire protocols:
//!
//! 1. every accepted connection is classified by its preface - an RPC
//!    content-type (`binary-rpc`, `binary-rpc+proto`) routes it to the
//!    framed RPC server, everything else goes to the REST gateway;
//! 2. both sub-servers are running before the demux loop starts accepting;
//! 3. start waits up to one second for an immediate serve error and treats
//!    silence as success; errors after that window are escalated through
//!    [`Host::report_fatal_error`];
//! 4. stop closes the listener and both sub-servers outright, without a
//!    graceful drain: telemetry is at-most-once at shutdown and callers
//!    retry.
//!
//! Starting reception for either data type starts both services; the alias
//! is legacy coupling kept for compatibility with existing operator tooling.

mod factory;
pub(crate) mod mux;
mod rest;
mod rpc;

#[cfg(test)]
#[path = "conflux_test.rs"]
mod tests;

pub use factory::ConfluxReceiverFactory;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conflux_component::{
    Component, ComponentError, Host, Lifecycle, MetricsConsumer, Receiver, TraceConsumer,
};
use conflux_config::ReceiverSettings;
use conflux_telemetry::wire::DEFAULT_PORT;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::mux::{PrefacedStream, Route};
use self::rest::RestState;
use self::rpc::RpcServer;

/// Name reported as the trace and metrics source
const SOURCE: &str = "conflux";

/// How long start waits for an immediate serve error before declaring success
const START_ERROR_WINDOW: Duration = Duration::from_secs(1);

/// Classified connections buffered per sub-server
const CONN_BACKLOG: usize = 64;

/// Configuration for the conflux receiver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfluxReceiverConfig {
    /// Common receiver settings; the endpoint defaults to `0.0.0.0:55678`
    #[serde(flatten)]
    pub settings: ReceiverSettings,

    /// Origins allowed on the REST gateway. Empty leaves the CORS filter out
    /// entirely.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ConfluxReceiverConfig {
    fn default() -> Self {
        Self {
            settings: ReceiverSettings {
                endpoint: format!("0.0.0.0:{DEFAULT_PORT}"),
                ..Default::default()
            },
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl conflux_config::ReceiverConfig for ConfluxReceiverConfig {
    fn settings(&self) -> &ReceiverSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ReceiverSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// The multiplexed trace/metrics receiver.
pub struct ConfluxReceiver {
    name: String,
    endpoint: String,
    cors_allowed_origins: Vec<String>,
    traces: Option<Arc<dyn TraceConsumer>>,
    metrics: Option<Arc<dyn MetricsConsumer>>,
    lifecycle: Lifecycle,
    shutdown: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConfluxReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluxReceiver")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish_non_exhaustive()
    }
}

impl ConfluxReceiver {
    /// Create the receiver services; reception starts with
    /// [`Component::start`].
    ///
    /// # Errors
    ///
    /// Fails when neither a trace nor a metrics consumer is given: a
    /// receiver nobody listens to cannot start.
    pub fn new(
        config: &ConfluxReceiverConfig,
        traces: Option<Arc<dyn TraceConsumer>>,
        metrics: Option<Arc<dyn MetricsConsumer>>,
    ) -> Result<Self, ComponentError> {
        let name = if config.settings.name.is_empty() {
            SOURCE.to_string()
        } else {
            config.settings.name.clone()
        };

        if traces.is_none() && metrics.is_none() {
            return Err(ComponentError::start_failed(
                name,
                "no consumers were specified",
            ));
        }

        Ok(Self {
            name,
            endpoint: config.settings.endpoint.clone(),
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            traces,
            metrics,
            lifecycle: Lifecycle::new(),
            shutdown: CancellationToken::new(),
            local_addr: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Address of the bound listener, available once start has bound it.
    /// Useful with an ephemeral port in the endpoint.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    async fn serve(
        &self,
        host: Arc<dyn Host>,
        cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        let listener = TcpListener::bind(&self.endpoint).await.map_err(|e| {
            ComponentError::start_failed(
                &self.name,
                format!("failed to bind {:?}: {e}", self.endpoint),
            )
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ComponentError::start_failed(&self.name, e))?;
        *self.local_addr.lock() = Some(local_addr);

        let (error_tx, mut error_rx) = mpsc::channel::<String>(4);
        let (rpc_tx, rpc_rx) = mpsc::channel(CONN_BACKLOG);
        let (rest_tx, rest_rx) = mpsc::channel(CONN_BACKLOG);

        // A cancel from the runtime folds into this receiver's own shutdown
        // so every sub-task watches a single token.
        let shutdown = self.shutdown.clone();
        let link = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => shutdown.cancel(),
                _ = shutdown.clone().cancelled_owned() => {}
            }
        });

        // Both sub-servers must be serving before the demux loop accepts.
        let rpc = Arc::new(RpcServer {
            traces: self.traces.clone(),
            metrics: self.metrics.clone(),
        });
        let rpc_task = tokio::spawn(rpc.serve(rpc_rx, self.shutdown.clone()));

        let app = rest::router(
            RestState {
                traces: self.traces.clone(),
                metrics: self.metrics.clone(),
            },
            &self.cors_allowed_origins,
        );
        let rest_error_tx = error_tx.clone();
        let rest_listener = VirtualListener {
            conns: rest_rx,
            local_addr,
        };
        let rest_task = tokio::spawn(async move {
            if let Err(error) = axum::serve(rest_listener, app).await {
                let _ = rest_error_tx.send(format!("rest server: {error}")).await;
            }
        });

        let accept_task = tokio::spawn(demux_loop(
            listener,
            rpc_tx,
            rest_tx,
            self.shutdown.clone(),
            error_tx.clone(),
        ));

        self.tasks
            .lock()
            .extend([link, rpc_task, rest_task, accept_task]);
        drop(error_tx);

        // Startup heuristic: an error inside the window fails start, silence
        // means the servers are at least running.
        match tokio::time::timeout(START_ERROR_WINDOW, error_rx.recv()).await {
            Ok(Some(reason)) => Err(ComponentError::start_failed(&self.name, reason)),
            Ok(None) => Err(ComponentError::start_failed(
                &self.name,
                "ingress tasks exited during startup",
            )),
            Err(_elapsed) => {
                let name = self.name.clone();
                let watch = tokio::spawn(async move {
                    if let Some(reason) = error_rx.recv().await {
                        host.report_fatal_error(ComponentError::fatal(name, reason));
                    }
                });
                self.tasks.lock().push(watch);
                Ok(())
            }
        }
    }

    /// Abort every sub-task and wait for each to wind down.
    async fn teardown(&self) {
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
    }
}

#[async_trait]
impl Component for ConfluxReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        host: Arc<dyn Host>,
        cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;
        tracing::info!(
            receiver = %self.name,
            endpoint = %self.endpoint,
            "starting conflux receiver"
        );

        match self.serve(host, cancel).await {
            Ok(()) => {
                self.lifecycle.start_succeeded();
                Ok(())
            }
            Err(error) => {
                self.shutdown.cancel();
                self.teardown().await;
                self.lifecycle.start_failed();
                Err(error)
            }
        }
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;

        // Close the listener and both sub-servers outright. No graceful
        // drain on the RPC side: it would impose a multi-second wait where
        // sub-second teardown is expected.
        self.shutdown.cancel();
        self.teardown().await;

        self.lifecycle.stopped();
        tracing::info!(receiver = %self.name, "conflux receiver stopped");
        Ok(())
    }
}

impl Receiver for ConfluxReceiver {
    fn trace_source(&self) -> &'static str {
        SOURCE
    }

    fn metrics_source(&self) -> &'static str {
        SOURCE
    }
}

/// Accept loop: classify each connection and hand it to its sub-server.
async fn demux_loop(
    listener: TcpListener,
    rpc_tx: mpsc::Sender<(PrefacedStream, SocketAddr)>,
    rest_tx: mpsc::Sender<(PrefacedStream, SocketAddr)>,
    cancel: CancellationToken,
    error_tx: mpsc::Sender<String>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(error) => {
                    let _ = error_tx.send(format!("accept: {error}")).await;
                    break;
                }
            },
        };

        let rpc_tx = rpc_tx.clone();
        let rest_tx = rest_tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let classified = tokio::select! {
                _ = cancel.cancelled() => return,
                classified = mux::classify(stream) => classified,
            };
            match classified {
                Ok((Route::Rpc, stream)) => {
                    let _ = rpc_tx.send((stream, peer)).await;
                }
                Ok((Route::Rest, stream)) => {
                    let _ = rest_tx.send((stream, peer)).await;
                }
                Err(error) => {
                    tracing::debug!(%peer, %error, "failed to classify connection");
                }
            }
        });
    }
}

/// Channel-backed listener feeding classified REST connections to axum.
struct VirtualListener {
    conns: mpsc::Receiver<(PrefacedStream, SocketAddr)>,
    local_addr: SocketAddr,
}

impl axum::serve::Listener for VirtualListener {
    type Io = PrefacedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.conns.recv().await {
            Some(conn) => conn,
            // The demux dropped its sender; park until the serve task is
            // aborted by stop.
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}
