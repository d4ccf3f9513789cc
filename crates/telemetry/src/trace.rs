//! Trace data types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity of the process that emitted a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Logical service the process belongs to
    pub service_name: String,

    /// Host the process runs on
    pub host_name: String,

    /// Free-form identity attributes (pid, sdk version, ...)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A single finished span.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    /// Hex-encoded trace identifier
    pub trace_id: String,

    /// Hex-encoded span identifier
    pub span_id: String,

    /// Parent span, absent for root spans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// Operation name
    pub name: String,

    /// Start time, nanoseconds since the unix epoch
    pub start_unix_nanos: u64,

    /// End time, nanoseconds since the unix epoch
    pub end_unix_nanos: u64,

    /// Span attributes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A batch of spans from one emitting node.
///
/// Batches are the unit of work in trace pipelines: receivers produce them,
/// processors may merge or re-cut them, exporters consume them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceBatch {
    /// Emitting process, when the wire protocol carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,

    /// The spans themselves
    pub spans: Vec<Span>,

    /// Name of the wire protocol the batch arrived on
    pub source_format: String,
}

impl TraceBatch {
    /// Number of spans in the batch
    #[inline]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// True when the batch carries no spans
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
