//! Error types for SCIM directory operations.
//!
//! This module provides the error hierarchy shared by the SCIM client crates, including
//! HTTP status code mapping for responses that the callers do not handle specially.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for SCIM operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Directory service could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected by the server
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Operation refused by tenant policy
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Response body could not be decoded
    #[error("Failed to parse SCIM response: {0}")]
    ParseError(String),

    /// Local validation failed, nothing was sent
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Server answered with a status the caller does not handle
    #[error("API call failed with status code: {status}. {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
}

/// Specialized result type for SCIM operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
        }
    }

    /// Returns the HTTP status carried by this error, if it came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps a non-success response to an error.
    #[must_use]
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::BAD_REQUEST => Self::BadRequest(body),
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            status => Self::UnexpectedStatus {
                status: status.as_u16(),
                body,
            },
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
