//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, ValidationError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Non-fatal: the in-memory state stays authoritative.
    #[error("could not persist '{key}': {source}")]
    PersistenceWriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("export blocked by {} structural error(s)", errors.len())]
    ExportBlocked { errors: Vec<ValidationError> },

    #[error("nothing to export: fill in at least one field of a top-level section")]
    NotExportable,

    #[error("document generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn operation(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
