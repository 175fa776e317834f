//! Error handling for the Farmdesk client
//!
//! Every error stays local to the component that issued the request and maps
//! to a short, user-facing message.

use serde::Serialize;
use shared::{FieldErrors, RingError};
use thiserror::Error;

use crate::services::capture::CaptureError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Session errors
    #[error("Not signed in")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Invalid boundary: {0}")]
    Boundary(#[from] RingError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Capture errors
    #[error("Location error: {0}")]
    Capture(#[from] CaptureError),

    // API errors
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    // Local errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error shape shown to the user
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl AppError {
    /// Build an API error from a non-success response body
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("message"))
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str().map(str::to_string))
            })
            .unwrap_or_else(|| body.trim().to_string());

        match status.as_u16() {
            401 => AppError::Unauthorized(message),
            404 => AppError::NotFound(message),
            code => AppError::Api {
                status: code,
                message,
            },
        }
    }

    /// True when resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let (code, message, fields) = match self {
            AppError::MissingToken => (
                "MISSING_TOKEN",
                "Please sign in to continue".to_string(),
                None,
            ),
            AppError::TokenExpired => (
                "TOKEN_EXPIRED",
                "Your session has expired, please sign in again".to_string(),
                None,
            ),
            AppError::InvalidToken(_) | AppError::Unauthorized(_) => (
                "UNAUTHORIZED",
                "You are not authorized to perform this action".to_string(),
                None,
            ),
            AppError::Validation(errors) => (
                "VALIDATION_ERROR",
                "Please correct the highlighted fields".to_string(),
                Some(errors.clone()),
            ),
            AppError::Boundary(e) => ("INVALID_BOUNDARY", e.to_string(), None),
            AppError::NotFound(what) => ("NOT_FOUND", format!("Not found: {}", what), None),
            AppError::Capture(e) => ("LOCATION_ERROR", e.to_string(), None),
            AppError::Api { status, message } => (
                "API_ERROR",
                format!("The server returned an error ({}): {}", status, message),
                None,
            ),
            AppError::Network(_) => (
                "NETWORK_ERROR",
                "Could not reach the server, check your connection and try again".to_string(),
                None,
            ),
            AppError::Decode(_) | AppError::Serialization(_) => (
                "UNEXPECTED_RESPONSE",
                "The server sent an unexpected response".to_string(),
                None,
            ),
            AppError::Storage(e) => ("STORAGE_ERROR", format!("Storage error: {}", e), None),
            AppError::Export(e) => ("EXPORT_ERROR", format!("Export failed: {}", e), None),
            AppError::Configuration(msg) => (
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                None,
            ),
        };

        ErrorDetail {
            code: code.to_string(),
            message,
            fields,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Result type alias for client operations
pub type AppResult<T> = Result<T, AppError>;
