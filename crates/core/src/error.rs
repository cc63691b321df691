// Central Error Type for the persistence facade

use thiserror::Error;

/// Facade-level error type
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown persistence unit: {0}")]
    UnknownUnit(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A handler operation failed; `source` is the underlying cause
    #[error("{operation} failed: {source}")]
    Failed {
        operation: &'static str,
        #[source]
        source: Box<PersistenceError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistenceError {
    pub(crate) fn failed(operation: &'static str, source: PersistenceError) -> Self {
        match source {
            // A nested handler call already named its operation
            already @ PersistenceError::Failed { .. } => already,
            other => PersistenceError::Failed {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The innermost cause, skipping operation wrappers
    pub fn root(&self) -> &PersistenceError {
        match self {
            PersistenceError::Failed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias using PersistenceError
pub type Result<T> = std::result::Result<T, PersistenceError>;

impl From<config::ConfigError> for PersistenceError {
    fn from(err: config::ConfigError) -> Self {
        PersistenceError::Config(err.to_string())
    }
}

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to PersistenceError::Database(String)
