//! Shared error types for the test engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid run id: {input}")]
    InvalidRunId { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

impl SharedError {
    pub fn invalid_config(field: impl Into<String>, value: impl Into<String>) -> Self {
        SharedError::InvalidConfig {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
