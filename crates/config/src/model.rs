//! Configuration entities
//!
//! Receivers, processors and exporters share common settings but carry
//! open-ended per-type fields, so their configuration is polymorphic: typed
//! payloads embed the common settings struct (serde-flattened) and implement
//! the matching `*Config` trait. Factories downcast through `as_any` to get
//! their payload back.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Separator between the type and name parts of a composite key
pub const TYPE_AND_NAME_SEPARATOR: char = '/';

/// Data types a pipeline can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Trace spans
    #[default]
    Traces,
    /// Metric points
    Metrics,
}

impl DataType {
    /// The tag used as the type part of pipeline keys
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
        }
    }

    /// Parse a pipeline key's type part
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "traces" => Some(Self::Traces),
            "metrics" => Some(Self::Metrics),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common settings for receiver configurations.
///
/// Typed receiver configs embed this (serde-flattened) and extend it with
/// their own fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    /// Factory discriminator; injected from the config key, never decoded
    #[serde(skip)]
    pub type_tag: String,

    /// Normalized full name; injected from the config key
    #[serde(skip)]
    pub name: String,

    /// Disabled receivers are pruned at validation; enabled by default
    pub disabled: bool,

    /// `host:port` the receiver binds; the factory fills the default
    pub endpoint: String,
}

impl ReceiverSettings {
    /// True unless the receiver was explicitly disabled
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }
}

/// Common settings for processor configurations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// Factory discriminator; injected from the config key, never decoded
    #[serde(skip)]
    pub type_tag: String,

    /// Normalized full name; injected from the config key
    #[serde(skip)]
    pub name: String,

    /// Disabled processors are pruned at validation; enabled by default
    pub disabled: bool,
}

impl ProcessorSettings {
    /// True unless the processor was explicitly disabled
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }
}

/// Common settings for exporter configurations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExporterSettings {
    /// Factory discriminator; injected from the config key, never decoded
    #[serde(skip)]
    pub type_tag: String,

    /// Normalized full name; injected from the config key
    #[serde(skip)]
    pub name: String,

    /// Disabled exporters are pruned at validation; enabled by default
    pub disabled: bool,
}

impl ExporterSettings {
    /// True unless the exporter was explicitly disabled
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }
}

/// Polymorphic receiver configuration produced by a receiver factory.
pub trait ReceiverConfig: fmt::Debug + Send + Sync {
    /// The common settings
    fn settings(&self) -> &ReceiverSettings;

    /// Mutable access, used by the loader to inject type and name
    fn settings_mut(&mut self) -> &mut ReceiverSettings;

    /// Downcast hook for factories
    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn ReceiverConfig + 'a {
    /// Normalized full name
    pub fn name(&self) -> &str {
        &self.settings().name
    }

    /// Factory discriminator
    pub fn type_tag(&self) -> &str {
        &self.settings().type_tag
    }

    /// True unless explicitly disabled
    pub fn is_enabled(&self) -> bool {
        self.settings().is_enabled()
    }
}

/// Polymorphic processor configuration produced by a processor factory.
pub trait ProcessorConfig: fmt::Debug + Send + Sync {
    /// The common settings
    fn settings(&self) -> &ProcessorSettings;

    /// Mutable access, used by the loader to inject type and name
    fn settings_mut(&mut self) -> &mut ProcessorSettings;

    /// Downcast hook for factories
    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn ProcessorConfig + 'a {
    /// Normalized full name
    pub fn name(&self) -> &str {
        &self.settings().name
    }

    /// Factory discriminator
    pub fn type_tag(&self) -> &str {
        &self.settings().type_tag
    }

    /// True unless explicitly disabled
    pub fn is_enabled(&self) -> bool {
        self.settings().is_enabled()
    }
}

/// Polymorphic exporter configuration produced by an exporter factory.
pub trait ExporterConfig: fmt::Debug + Send + Sync {
    /// The common settings
    fn settings(&self) -> &ExporterSettings;

    /// Mutable access, used by the loader to inject type and name
    fn settings_mut(&mut self) -> &mut ExporterSettings;

    /// Downcast hook for factories
    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn ExporterConfig + 'a {
    /// Normalized full name
    pub fn name(&self) -> &str {
        &self.settings().name
    }

    /// Factory discriminator
    pub fn type_tag(&self) -> &str {
        &self.settings().type_tag
    }

    /// True unless explicitly disabled
    pub fn is_enabled(&self) -> bool {
        self.settings().is_enabled()
    }
}

/// A single pipeline: receivers feeding a processor chain feeding exporters.
///
/// The data type comes from the config key prefix, never from the body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Normalized full name; injected from the config key
    #[serde(skip)]
    pub name: String,

    /// Data type, derived from the key prefix
    #[serde(skip)]
    pub input_type: DataType,

    /// Full names of the receivers feeding this pipeline
    pub receivers: Vec<String>,

    /// Full names of the processors, in chain order
    pub processors: Vec<String>,

    /// Full names of the exporters the pipeline fans out to
    pub exporters: Vec<String>,
}

/// The validated root configuration.
///
/// Maps are keyed by normalized full name and sorted, so iteration (and with
/// it build and start order) is deterministic. Entities are frozen once
/// validation finishes; only the validator mutates them, to prune disabled
/// references.
#[derive(Debug, Default)]
pub struct Config {
    /// Receivers by full name
    pub receivers: BTreeMap<String, Box<dyn ReceiverConfig>>,

    /// Processors by full name
    pub processors: BTreeMap<String, Box<dyn ProcessorConfig>>,

    /// Exporters by full name
    pub exporters: BTreeMap<String, Box<dyn ExporterConfig>>,

    /// Pipelines by full name
    pub pipelines: BTreeMap<String, PipelineConfig>,
}
