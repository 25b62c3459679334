//! Crate-level error types
//!
//! Routing and parsing problems are absorbed by the workforce's fallbacks and
//! never reach this type. What does surface here is a worker's own failure, an
//! impossible selection (no workers at all), or a construction/config error.

use crate::config::ConfigError;
use crate::routing::agent_selector::SelectionError;
use crate::routing::plan_extractor::SchemaError;
use crate::worker::WorkerError;
use thiserror::Error;

/// Main error type for workforce operations
#[derive(Debug, Error)]
pub enum WorkforceError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Worker '{name}' is already registered")]
    DuplicateWorker { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl WorkforceError {
    /// Create duplicate worker error
    pub fn duplicate_worker<S: Into<String>>(name: S) -> Self {
        Self::DuplicateWorker { name: name.into() }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type for workforce operations
pub type WorkforceResult<T> = Result<T, WorkforceError>;
