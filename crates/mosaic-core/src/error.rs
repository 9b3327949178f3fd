use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for the Mosaic workflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Operation not allowed in the current wizard state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Wizard or module definition breaks a structural invariant
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// Module not found in the graph
    #[error("Module not found: {0}")]
    UnknownModule(String),

    /// No wizard registered for the module
    #[error("Wizard not found: {0}")]
    UnknownWizard(String),

    /// Module dependencies are not satisfied
    #[error("Module is locked: {0}")]
    ModuleLocked(String),

    /// A stage is already in flight for the wizard instance
    #[error("Stage already running for instance: {0}")]
    StageAlreadyRunning(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigurationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}

/// Failure classes an async stage can resolve with.
///
/// This is the only failure vocabulary that leaves the stage runner; raw
/// provider errors are converted before they reach a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// The provider did not answer within the configured window
    Timeout,
    /// The provider refused the request
    Rejected,
    /// The provider answered with something unusable
    InvalidResponse,
}

impl std::fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StageErrorKind::Timeout => "timeout",
            StageErrorKind::Rejected => "rejected",
            StageErrorKind::InvalidResponse => "invalid_response",
        };
        f.write_str(label)
    }
}

/// Error raised by an external provider behind a stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider itself reported a timeout
    #[error("Provider timed out")]
    Timeout,

    /// The provider declined the request
    #[error("Provider rejected the request: {0}")]
    Rejected(String),

    /// The provider response could not be interpreted
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider could not be reached
    #[error("Provider transport error: {0}")]
    Transport(String),
}

impl From<ProviderError> for StageErrorKind {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => StageErrorKind::Timeout,
            ProviderError::Rejected(_) | ProviderError::Transport(_) => StageErrorKind::Rejected,
            ProviderError::InvalidResponse(_) => StageErrorKind::InvalidResponse,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}
