//! Crate wide error types
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external ionosphere or correction model.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{model}: {message}")]
pub struct ModelError {
    pub model: String,
    pub message: String,
}

impl ModelError {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid layer bounds, resolution or geographic coverage
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Invalid query arguments
    #[error("validation error: {0}")]
    Validation(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("batch {index} failed after {attempts} attempt(s): {source}")]
    BatchFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: ModelError,
    },
    #[error("batch {index} timed out after {attempts} attempt(s) of {timeout:?}")]
    BatchTimeout {
        index: usize,
        attempts: u32,
        timeout: Duration,
    },
    #[error("worker pool error: {0}")]
    Pool(String),
}

pub type Result<T> = std::result::Result<T, Error>;
