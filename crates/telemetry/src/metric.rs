//! Metrics data types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trace::Node;

/// How a metric value accumulates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Point-in-time measurement
    #[default]
    Gauge,

    /// Monotonically increasing total
    Counter,
}

/// A single metric data point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    /// Metric name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Unit of the value (e.g. "ms", "bytes")
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,

    /// Accumulation semantics
    pub kind: MetricKind,

    /// The measured value
    pub value: f64,

    /// Measurement time, nanoseconds since the unix epoch
    pub unix_nanos: u64,

    /// Dimension labels
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A batch of metric points from one emitting node.
///
/// Metrics pipelines carry no processors, so batches flow from receiver
/// fan-out straight to the exporter fan-out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsBatch {
    /// Emitting process, when the wire protocol carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,

    /// The metric points themselves
    pub metrics: Vec<Metric>,

    /// Name of the wire protocol the batch arrived on
    pub source_format: String,
}

impl MetricsBatch {
    /// Number of metric points in the batch
    #[inline]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// True when the batch carries no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
