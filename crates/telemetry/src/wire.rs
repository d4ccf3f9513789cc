//! Wire envelope shared by the RPC protocol and its REST translation
//!
//! The canonical receiver serves two protocols on one port:
//!
//! - a binary-framed RPC stream: 4-byte big-endian length prefix, each frame
//!   a JSON-encoded [`ExportRequest`], answered with one [`ExportResponse`]
//!   frame per request;
//! - a REST gateway carrying the same JSON payloads over plain HTTP
//!   (`POST /v1/traces`, `POST /v1/metrics`).
//!
//! The forwarding exporter speaks the RPC side of this envelope when shipping
//! batches to another collector.

use serde::{Deserialize, Serialize};

use crate::{MetricsBatch, TraceBatch};

/// Port the canonical receiver binds when none is configured.
pub const DEFAULT_PORT: u16 = 55678;

/// Content-type that routes a multiplexed connection to the RPC server.
pub const RPC_CONTENT_TYPE: &str = "binary-rpc";

/// Variant content-type accepted for the RPC server.
pub const RPC_CONTENT_TYPE_PROTO: &str = "binary-rpc+proto";

/// Largest frame accepted on the RPC wire.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// One framed export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportRequest {
    /// A batch of spans
    Traces(TraceBatch),

    /// A batch of metric points
    Metrics(MetricsBatch),
}

/// Acknowledgement for one export request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportResponse {
    /// Spans or metric points accepted into the pipeline
    pub accepted: u64,

    /// Set when the collector could not take the data (e.g. no pipeline is
    /// configured for the data type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
