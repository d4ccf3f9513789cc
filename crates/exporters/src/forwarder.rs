//! Conflux exporter - collector-to-collector forwarding
//!
//! Ships batches to another collector over the framed RPC wire: a preface
//! with the RPC content-type, then length-prefixed JSON `ExportRequest`
//! frames, each answered by one `ExportResponse` frame.
//!
//! The connection is dialed lazily on the first batch and kept open. A send
//! that fails on a broken connection is retried once on a fresh dial; the
//! retry failing surfaces as a consume error, which the fan-out upstream
//! records as a drop.

use std::any::Any;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use conflux_component::{
    Component, ComponentError, ConsumeError, Exporter, Host, Lifecycle, MetricsConsumer,
    TraceConsumer,
};
use conflux_config::{ExporterConfig, ExporterFactory, ExporterSettings, Factory, FactoryError};
use conflux_telemetry::wire::{ExportRequest, ExportResponse, MAX_FRAME_LEN, RPC_CONTENT_TYPE};
use conflux_telemetry::{MetricsBatch, TraceBatch};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

/// Type tag of the conflux exporter
const TYPE_TAG: &str = "conflux";

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-frame write/ack timeout
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

type FramedConn = Framed<TcpStream, LengthDelimitedCodec>;

/// Configuration for the conflux exporter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfluxExporterConfig {
    /// Common exporter settings
    #[serde(flatten)]
    pub settings: ExporterSettings,

    /// `host:port` of the upstream collector
    pub endpoint: String,

    /// Dial timeout (e.g. "10s")
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Per-frame write and ack timeout (e.g. "5s")
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for ConfluxExporterConfig {
    fn default() -> Self {
        Self {
            settings: ExporterSettings::default(),
            endpoint: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ExporterConfig for ConfluxExporterConfig {
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

/// The conflux forwarding exporter.
pub struct ConfluxExporter {
    name: String,
    endpoint: String,
    connect_timeout: Duration,
    write_timeout: Duration,
    conn: Mutex<Option<FramedConn>>,
    lifecycle: Lifecycle,
}

impl std::fmt::Debug for ConfluxExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluxExporter")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl ConfluxExporter {
    /// Create a forwarding exporter
    pub fn new(config: &ConfluxExporterConfig) -> Self {
        Self {
            name: if config.settings.name.is_empty() {
                TYPE_TAG.to_string()
            } else {
                config.settings.name.clone()
            },
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout,
            write_timeout: config.write_timeout,
            conn: Mutex::new(None),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Dial the upstream collector and send the RPC preface.
    async fn connect(&self) -> io::Result<FramedConn> {
        let mut stream =
            tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
                .await
                .map_err(|_| io::Error::new(ErrorKind::TimedOut, "connect timed out"))??;

        let preface = format!(
            "POST /export HTTP/1.1\r\nhost: {}\r\ncontent-type: {RPC_CONTENT_TYPE}\r\n\r\n",
            self.endpoint
        );
        stream.write_all(preface.as_bytes()).await?;

        tracing::debug!(
            exporter = %self.name,
            endpoint = %self.endpoint,
            "connected to upstream collector"
        );

        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        Ok(Framed::new(stream, codec))
    }

    /// Send one frame and read its ack on the cached connection, dialing
    /// first when there is none. A failed round trip drops the connection.
    async fn try_send(
        &self,
        guard: &mut Option<FramedConn>,
        payload: Bytes,
    ) -> io::Result<ExportResponse> {
        let mut framed = match guard.take() {
            Some(framed) => framed,
            None => self.connect().await?,
        };

        match self.round_trip(&mut framed, payload).await {
            Ok(response) => {
                *guard = Some(framed);
                Ok(response)
            }
            Err(error) => Err(error),
        }
    }

    async fn round_trip(
        &self,
        framed: &mut FramedConn,
        payload: Bytes,
    ) -> io::Result<ExportResponse> {
        tokio::time::timeout(self.write_timeout, framed.send(payload))
            .await
            .map_err(|_| io::Error::new(ErrorKind::TimedOut, "write timed out"))??;

        let frame = tokio::time::timeout(self.write_timeout, framed.next())
            .await
            .map_err(|_| io::Error::new(ErrorKind::TimedOut, "ack timed out"))?
            .ok_or_else(|| {
                io::Error::new(ErrorKind::UnexpectedEof, "connection closed before ack")
            })??;

        serde_json::from_slice(&frame).map_err(io::Error::other)
    }

    /// Forward one request, reconnecting once on a broken connection.
    async fn export(&self, request: &ExportRequest) -> Result<(), ConsumeError> {
        let payload = Bytes::from(
            serde_json::to_vec(request).map_err(|e| ConsumeError::export(format!("encode: {e}")))?,
        );

        let mut guard = self.conn.lock().await;
        let response = match self.try_send(&mut guard, payload.clone()).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    exporter = %self.name,
                    endpoint = %self.endpoint,
                    %error,
                    "forwarding failed, retrying on a fresh connection"
                );
                self.try_send(&mut guard, payload).await.map_err(|e| {
                    ConsumeError::export(format!("forwarding to {}: {e}", self.endpoint))
                })?
            }
        };

        if let Some(error) = response.error {
            // The remote took the connection but not the data; its pipeline
            // configuration is the problem, not this connection.
            tracing::warn!(
                exporter = %self.name,
                endpoint = %self.endpoint,
                %error,
                "upstream collector rejected batch"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Component for ConfluxExporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        _host: Arc<dyn Host>,
        _cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;
        // The dial is lazy: the upstream collector may come up after us.
        self.lifecycle.start_succeeded();
        tracing::info!(
            exporter = %self.name,
            endpoint = %self.endpoint,
            "conflux exporter started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;
        self.conn.lock().await.take();
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for ConfluxExporter {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.export(&ExportRequest::Traces(batch.as_ref().clone())).await
    }
}

#[async_trait]
impl MetricsConsumer for ConfluxExporter {
    async fn consume_metrics(&self, batch: Arc<MetricsBatch>) -> Result<(), ConsumeError> {
        self.export(&ExportRequest::Metrics(batch.as_ref().clone())).await
    }
}

impl Exporter for ConfluxExporter {}

/// Factory for the conflux exporter.
pub struct ConfluxExporterFactory;

impl Factory for ConfluxExporterFactory {
    fn type_tag(&self) -> &'static str {
        TYPE_TAG
    }
}

impl ExporterFactory for ConfluxExporterFactory {
    fn create_default_config(&self) -> Box<dyn ExporterConfig> {
        Box::new(ConfluxExporterConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ExporterConfig>, toml::de::Error> {
        Ok(Box::new(
            fragment.clone().try_into::<ConfluxExporterConfig>()?,
        ))
    }

    fn create_exporter(
        &self,
        config: &dyn ExporterConfig,
    ) -> Result<Arc<dyn Exporter>, FactoryError> {
        let name = config.name().to_string();
        let config = config
            .as_any()
            .downcast_ref::<ConfluxExporterConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(TYPE_TAG, &name))?;

        if config.endpoint.is_empty() {
            return Err(FactoryError::create(TYPE_TAG, &name, "endpoint must be set"));
        }

        Ok(Arc::new(ConfluxExporter::new(config)))
    }
}

#[cfg(test)]
#[path = "forwarder_test.rs"]
mod tests;
