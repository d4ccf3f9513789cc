//! Component error types

use thiserror::Error;

/// Errors and lifecycle signals surfaced by components.
///
/// `AlreadyStarted` and `AlreadyStopped` are signals, not failures: they tell
/// the caller that the requested transition already happened. The runtime
/// treats them as success.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Start was called on a component that is starting or running
    #[error("already started")]
    AlreadyStarted,

    /// Stop was called on a component that is stopping or stopped
    #[error("already stopped")]
    AlreadyStopped,

    /// The component could not reach the running state
    #[error("{component} failed to start: {reason}")]
    StartFailed {
        /// Configured full name of the component
        component: String,
        /// What went wrong
        reason: String,
    },

    /// The component could not release its resources cleanly
    #[error("{component} failed to stop: {reason}")]
    StopFailed {
        /// Configured full name of the component
        component: String,
        /// What went wrong
        reason: String,
    },

    /// An unrecoverable runtime error, reported through the host
    #[error("{component}: {reason}")]
    Fatal {
        /// Configured full name of the component
        component: String,
        /// What went wrong
        reason: String,
    },
}

impl ComponentError {
    /// Create a StartFailed error
    pub fn start_failed(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::StartFailed {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a StopFailed error
    pub fn stop_failed(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::StopFailed {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Fatal error
    pub fn fatal(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fatal {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the idempotence signals callers treat as success
    pub fn is_lifecycle_signal(&self) -> bool {
        matches!(self, Self::AlreadyStarted | Self::AlreadyStopped)
    }
}

/// Errors returned by consumers on the data path.
///
/// These never propagate upstream past a fan-out boundary; the fan-out logs
/// the error and records a drop.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The consumer's internal queue is full
    #[error("consumer queue full")]
    QueueFull,

    /// The consumer is shutting down and no longer takes data
    #[error("consumer is shutting down")]
    ShuttingDown,

    /// The backend rejected the data
    #[error("{0}")]
    Export(String),
}

impl ConsumeError {
    /// Create an Export error
    pub fn export(reason: impl Into<String>) -> Self {
        Self::Export(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_signals() {
        assert!(ComponentError::AlreadyStarted.is_lifecycle_signal());
        assert!(ComponentError::AlreadyStopped.is_lifecycle_signal());
        assert!(!ComponentError::start_failed("r", "boom").is_lifecycle_signal());
    }

    #[test]
    fn test_start_failed_names_the_component() {
        let err = ComponentError::start_failed("conflux/custom", "bind refused");
        assert!(err.to_string().contains("conflux/custom"));
        assert!(err.to_string().contains("bind refused"));
    }

    #[test]
    fn test_export_error_message() {
        let err = ConsumeError::export("backend unavailable");
        assert_eq!(err.to_string(), "backend unavailable");
    }
}
