//! Pipeline error types

use conflux_component::ComponentError;
use conflux_config::FactoryError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors from building or running the pipeline graph.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No enabled receiver survived into the graph
    #[error("config must contain at least one enabled receiver")]
    MissingReceivers,

    /// No enabled exporter survived into the graph
    #[error("config must contain at least one enabled exporter")]
    MissingExporters,

    /// A pipeline references a component name missing from the config maps
    #[error("{kind} {name:?} is not defined in the config")]
    UnknownComponent {
        /// Entity kind
        kind: &'static str,
        /// The dangling name
        name: String,
    },

    /// No factory is registered for a component's type tag
    #[error("no {kind} factory registered for type {type_tag:?}")]
    UnknownType {
        /// Entity kind
        kind: &'static str,
        /// The unregistered tag
        type_tag: String,
    },

    /// A factory failed to instantiate a component
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// A component failed to start or stop
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Startup was cancelled before every component started
    #[error("startup cancelled")]
    Cancelled,
}
