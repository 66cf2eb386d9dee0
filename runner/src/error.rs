//! Runner-specific error types

use shared::SharedError;
use thiserror::Error;

/// Errors raised while registering a declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid modifier combination on '{title}': {reason}")]
    InvalidModifierCombination { title: String, reason: String },

    #[error("Duplicate test title: '{title}'")]
    DuplicateTitle { title: String },

    #[error("Test at position {position} has no title and collides with another untitled test")]
    MissingTitle { position: usize },

    #[error("Declaration '{title}' has no implementation")]
    MissingImplementation { title: String },

    #[error("Registered {registered} of {} macro units", .registered + .failures.len())]
    PartiallyRegistered {
        registered: usize,
        failures: Vec<RegistrationError>,
    },
}

impl RegistrationError {
    pub fn invalid(title: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistrationError::InvalidModifierCombination {
            title: title.into(),
            reason: reason.into(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistrationError>;

/// Errors raised by the runner's configuration and services
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Snapshot store error: {operation} on {path}")]
    SnapshotStoreError { operation: String, path: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RunnerError {
    pub fn config(field: impl Into<String>) -> Self {
        RunnerError::ConfigurationError { field: field.into() }
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
