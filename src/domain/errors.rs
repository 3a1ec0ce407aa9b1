//! Domain layer error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Invalid category: {value}")]
    InvalidCategory { value: String },

    #[error("Invalid finding id: {value}")]
    InvalidFindingId { value: String },

    #[error("Invalid severity: {value}")]
    InvalidSeverity { value: String },
}
