//! Error types for the stagechain framework.
//!
//! Only configuration mistakes surface here. Failures produced by a stage or
//! a root action travel inside the pipeline's result type and are never
//! wrapped by the chain.

use thiserror::Error;

/// Convenience alias for results returned by builder, runner and registry
/// operations.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Operations that can be rejected by a builder's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Adding a stage to the builder.
    Register,
    /// Composing the registered stages into a pipeline.
    Build,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Build => f.write_str("build"),
        }
    }
}

/// The main error type for stagechain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A required value was absent.
    #[error("Argument '{param}' must not be absent")]
    Argument {
        /// Name of the offending parameter.
        param: &'static str,
    },

    /// The operation is not legal in the builder's current state.
    #[error("Cannot {operation}: {reason}")]
    InvalidState {
        /// The rejected operation.
        operation: Operation,
        /// Why the operation was rejected.
        reason: String,
    },

    /// Invalid registry configuration or lookup.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Creates an argument error for the named parameter.
    #[must_use]
    pub fn argument(param: &'static str) -> Self {
        Self::Argument { param }
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(operation: Operation, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the offending parameter name for argument errors.
    #[must_use]
    pub fn param(&self) -> Option<&'static str> {
        match self {
            Self::Argument { param } => Some(*param),
            _ => None,
        }
    }

    /// Returns true if this is an invalid state error.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_argument_error_names_param() {
        let err = PipelineError::argument("stage");
        assert_eq!(err.param(), Some("stage"));
        assert_eq!(err.to_string(), "Argument 'stage' must not be absent");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = PipelineError::invalid_state(Operation::Build, "pipeline already built");
        assert!(err.is_invalid_state());
        assert_eq!(err.param(), None);
        assert_eq!(err.to_string(), "Cannot build: pipeline already built");
    }

    #[test]
    fn test_config_error() {
        let err = PipelineError::config("bad lifetime");
        assert!(err.to_string().contains("bad lifetime"));
        assert!(!err.is_invalid_state());
    }
}
