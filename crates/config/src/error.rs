//! Configuration error types

use std::io;

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration.
///
/// Loading halts on the first error; no partial configuration is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Malformed `type[/name]` composite key
    #[error("invalid key {key:?}: {reason}")]
    InvalidTypeAndNameKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// No receiver factory is registered for the type
    #[error("unknown receiver type {0:?}")]
    UnknownReceiverType(String),

    /// No processor factory is registered for the type
    #[error("unknown processor type {0:?}")]
    UnknownProcessorType(String),

    /// No exporter factory is registered for the type
    #[error("unknown exporter type {0:?}")]
    UnknownExporterType(String),

    /// Two receiver keys normalize to the same full name
    #[error("duplicate receiver name {0:?}")]
    DuplicateReceiverName(String),

    /// Two processor keys normalize to the same full name
    #[error("duplicate processor name {0:?}")]
    DuplicateProcessorName(String),

    /// Two exporter keys normalize to the same full name
    #[error("duplicate exporter name {0:?}")]
    DuplicateExporterName(String),

    /// Two pipeline keys normalize to the same full name
    #[error("duplicate pipeline name {0:?}")]
    DuplicatePipelineName(String),

    /// Pipeline key whose type part is not a known data type
    #[error("invalid pipeline type {0:?} (must be traces or metrics)")]
    InvalidPipelineType(String),

    /// The config declares no pipelines
    #[error("config must contain at least one pipeline")]
    MissingPipelines,

    /// The config declares no receivers, or every receiver is disabled
    #[error("config must contain at least one enabled receiver")]
    MissingReceivers,

    /// The config declares no exporters, or every exporter is disabled
    #[error("config must contain at least one enabled exporter")]
    MissingExporters,

    /// A pipeline's receiver list is empty, or pruning disabled receivers
    /// emptied it
    #[error("pipeline {0:?} must have at least one receiver")]
    PipelineMustHaveReceiver(String),

    /// A pipeline's exporter list is empty, or pruning disabled exporters
    /// emptied it
    #[error("pipeline {0:?} must have at least one exporter")]
    PipelineMustHaveExporter(String),

    /// A traces pipeline declares no processors
    #[error("pipeline {0:?} must have at least one processor")]
    PipelineMustHaveProcessors(String),

    /// A metrics pipeline declares processors
    #[error("metrics pipeline {0:?} cannot have processors")]
    MetricPipelineCannotHaveProcessors(String),

    /// A pipeline references a receiver missing from the top-level map
    #[error("pipeline {pipeline:?} references receiver {reference:?} which does not exist")]
    PipelineReceiverNotExists {
        /// The referencing pipeline
        pipeline: String,
        /// The dangling reference
        reference: String,
    },

    /// A pipeline references a processor missing from the top-level map
    #[error("pipeline {pipeline:?} references processor {reference:?} which does not exist")]
    PipelineProcessorNotExists {
        /// The referencing pipeline
        pipeline: String,
        /// The dangling reference
        reference: String,
    },

    /// A pipeline references an exporter missing from the top-level map
    #[error("pipeline {pipeline:?} references exporter {reference:?} which does not exist")]
    PipelineExporterNotExists {
        /// The referencing pipeline
        pipeline: String,
        /// The dangling reference
        reference: String,
    },

    /// A component's settings failed to decode
    #[error("error reading settings for {kind} {key:?}: {message}")]
    Unmarshal {
        /// Entity kind ("receiver", "processor", "exporter", "pipeline")
        kind: &'static str,
        /// The config key being decoded
        key: String,
        /// Decoder error
        message: String,
    },
}

impl ConfigError {
    /// Create an Unmarshal error
    pub fn unmarshal(kind: &'static str, key: impl Into<String>, error: impl ToString) -> Self {
        Self::Unmarshal {
            kind,
            key: key.into(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_mentions_key_and_reason() {
        let err = ConfigError::InvalidTypeAndNameKey {
            key: "/x".into(),
            reason: "the type part must be present".into(),
        };
        assert!(err.to_string().contains("/x"));
        assert!(err.to_string().contains("type part"));
    }

    #[test]
    fn test_unmarshal_mentions_kind_and_key() {
        let err = ConfigError::unmarshal("receiver", "conflux", "invalid endpoint");
        assert!(err.to_string().contains("receiver"));
        assert!(err.to_string().contains("conflux"));
        assert!(err.to_string().contains("invalid endpoint"));
    }

    #[test]
    fn test_reference_error_names_both_sides() {
        let err = ConfigError::PipelineExporterNotExists {
            pipeline: "traces/default".into(),
            reference: "missing".into(),
        };
        assert!(err.to_string().contains("traces/default"));
        assert!(err.to_string().contains("missing"));
    }
}
