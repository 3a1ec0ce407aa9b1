//! Application layer error types

use crate::domain::DomainError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Directory API error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Detector failure: {message}")]
    Detector { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },
}

/// Errors from the remote directory API and its transport
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout occurred after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classified HTTP-level errors from the directory API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Authorization failed with status {status}")]
    Authorization { status: u16 },

    #[error("Rate limited by upstream API")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Service unavailable")]
    ServiceUnavailable,
}

/// Durable storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApplicationError {
    /// Get the error type as a string for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            ApplicationError::Domain(_) => "domain_error",
            ApplicationError::Directory(_) => "directory_error",
            ApplicationError::Storage(_) => "storage_error",
            ApplicationError::Detector { .. } => "detector_error",
            ApplicationError::Configuration { .. } => "configuration_error",
            ApplicationError::Json(_) => "json_error",
            ApplicationError::NotFound { .. } => "not_found",
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApplicationError::Domain(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApplicationError::Directory(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApplicationError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal storage error".to_string(),
            ),
            ApplicationError::Detector { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApplicationError::Configuration { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApplicationError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal serialization error".to_string(),
            ),
            ApplicationError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": self.error_type(),
                "status": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}
