// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: String },

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Named query not found: {0}")]
    NamedQueryNotFound(String),

    #[error("Stored procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
