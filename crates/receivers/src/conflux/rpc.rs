//! Framed RPC server for the binary export protocol
//!
//! # Protocol
//!
//! Connections open with an HTTP/1.1-style preface whose `content-type` is
//! `binary-rpc` (or `binary-rpc+proto`); the demultiplexer strips the
//! preface before the stream reaches this server. The client then sends
//! 4-byte big-endian length-prefixed frames, each a JSON
//! [`ExportRequest`](conflux_telemetry::wire::ExportRequest); the server
//! answers every request frame with one
//! [`ExportResponse`](conflux_telemetry::wire::ExportResponse) frame.
//!
//! A malformed frame is answered with an error ack; the connection stays
//! open. Frame-level I/O errors close the connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use conflux_component::{MetricsConsumer, TraceConsumer};
use conflux_telemetry::wire::{ExportRequest, ExportResponse, MAX_FRAME_LEN};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use super::mux::PrefacedStream;

/// The RPC half of the multiplexed ingress.
pub(crate) struct RpcServer {
    pub(crate) traces: Option<Arc<dyn TraceConsumer>>,
    pub(crate) metrics: Option<Arc<dyn MetricsConsumer>>,
}

impl RpcServer {
    /// Accept classified connections until the channel closes or `cancel`
    /// fires.
    pub(crate) async fn serve(
        self: Arc<Self>,
        mut conns: mpsc::Receiver<(PrefacedStream, SocketAddr)>,
        cancel: CancellationToken,
    ) {
        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => break,
                conn = conns.recv() => match conn {
                    Some(conn) => conn,
                    None => break,
                },
            };

            let server = Arc::clone(&self);
            let conn_cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(error) = server.handle_connection(stream, conn_cancel).await {
                    tracing::debug!(%peer, %error, "rpc connection closed with error");
                }
            });
        }
    }

    async fn handle_connection(
        &self,
        stream: PrefacedStream,
        cancel: CancellationToken,
    ) -> io::Result<()> {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        let mut framed = Framed::new(stream, codec);

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = framed.next() => match frame {
                    Some(frame) => frame?,
                    None => break,
                },
            };

            let response = self.dispatch(&frame).await;
            let encoded = serde_json::to_vec(&response).map_err(io::Error::other)?;
            framed.send(Bytes::from(encoded)).await?;
        }

        Ok(())
    }

    async fn dispatch(&self, frame: &[u8]) -> ExportResponse {
        let request: ExportRequest = match serde_json::from_slice(frame) {
            Ok(request) => request,
            Err(error) => {
                return ExportResponse {
                    accepted: 0,
                    error: Some(format!("malformed frame: {error}")),
                };
            }
        };

        match request {
            ExportRequest::Traces(batch) => {
                let Some(consumer) = &self.traces else {
                    return ExportResponse {
                        accepted: 0,
                        error: Some("no traces pipeline configured".into()),
                    };
                };
                let accepted = batch.span_count() as u64;
                match consumer.consume_traces(Arc::new(batch)).await {
                    Ok(()) => ExportResponse {
                        accepted,
                        error: None,
                    },
                    Err(error) => ExportResponse {
                        accepted: 0,
                        error: Some(error.to_string()),
                    },
                }
            }
            ExportRequest::Metrics(batch) => {
                let Some(consumer) = &self.metrics else {
                    return ExportResponse {
                        accepted: 0,
                        error: Some("no metrics pipeline configured".into()),
                    };
                };
                let accepted = batch.metric_count() as u64;
                match consumer.consume_metrics(Arc::new(batch)).await {
                    Ok(()) => ExportResponse {
                        accepted,
                        error: None,
                    },
                    Err(error) => ExportResponse {
                        accepted: 0,
                        error: Some(error.to_string()),
                    },
                }
            }
        }
    }
}
