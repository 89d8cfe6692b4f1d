//! Unified error types for all layers of the application.

use crate::{DataKind, LocationKey};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use thiserror::Error;

/// Unified error type for all layers of Kisan.
#[derive(Error, Debug)]
pub enum KisanError {
    // ============ Domain Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    // ============ Cache Errors ============
    /// Neither the upstream source nor the durable cache could answer.
    #[error(transparent)]
    NoFallbackAvailable(#[from] NoFallbackAvailable),

    // ============ Infrastructure Errors ============
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External service error
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    // ============ Resilience Errors ============
    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KisanError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::NoFallbackAvailable(_) | Self::Timeout(_) => 503,
            Self::RateLimitExceeded => 429,
            Self::ExternalService { .. } => 502,
            Self::Database(_)
            | Self::Configuration(_)
            | Self::Cache(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NoFallbackAvailable(_) => "NO_CACHED_DATA",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::ExternalService { .. } | Self::Cache(_) | Self::Timeout(_)
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for KisanError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for KisanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Retry classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Timeouts, connection failures, 5xx and rate-limit responses.
    Transient,
    /// Malformed requests and responses; retrying cannot help.
    Permanent,
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// A classified failure returned by an upstream data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Retryable failure.
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// Non-retryable failure.
    #[error("Permanent upstream error: {0}")]
    Permanent(String),
}

impl UpstreamError {
    /// Creates a transient error.
    #[must_use]
    pub fn transient<T: Into<String>>(message: T) -> Self {
        Self::Transient(message.into())
    }

    /// Creates a permanent error.
    #[must_use]
    pub fn permanent<T: Into<String>>(message: T) -> Self {
        Self::Permanent(message.into())
    }

    /// Returns the retry classification.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Transient(_) => ErrorClass::Transient,
            Self::Permanent(_) => ErrorClass::Permanent,
        }
    }

    /// Returns the underlying message without the classification prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Permanent(message) => message,
        }
    }
}

/// Final read-path failure: the upstream failed and the durable cache had nothing.
///
/// `Display` is user-facing. The raw upstream message is kept in
/// [`last_error`](Self::last_error) for structured logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "No cached {label} data is available for {location} right now. Please try again later.",
    label = .kind.label()
)]
pub struct NoFallbackAvailable {
    /// Requested data kind.
    pub kind: DataKind,
    /// Requested location.
    pub location: LocationKey,
    /// Classification of the last upstream failure.
    pub last_error_class: ErrorClass,
    /// Total upstream invocations made.
    pub attempts: u32,
    /// Last upstream error message, for diagnostics.
    pub last_error: String,
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response from a `KisanError`.
    #[must_use]
    pub fn from_error(error: &KisanError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&KisanError> for ErrorResponse {
    fn from(error: &KisanError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fallback() -> NoFallbackAvailable {
        NoFallbackAvailable {
            kind: DataKind::SevenDayForecast,
            location: LocationKey::new("Pune", "Maharashtra").unwrap(),
            last_error_class: ErrorClass::Transient,
            attempts: 4,
            last_error: "reqwest::Error { kind: Request, source: hyper::Error(Connect) }".to_string(),
        }
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(KisanError::not_found("Entry", 1).status_code(), 404);
        assert_eq!(KisanError::validation("bad district").status_code(), 400);
        assert_eq!(KisanError::RateLimitExceeded.status_code(), 429);
        assert_eq!(KisanError::from(no_fallback()).status_code(), 503);
        assert_eq!(KisanError::Database("db error".to_string()).status_code(), 500);
        assert_eq!(KisanError::Timeout("timed out".to_string()).status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(KisanError::validation("bad input").error_code(), "VALIDATION_ERROR");
        assert_eq!(KisanError::from(no_fallback()).error_code(), "NO_CACHED_DATA");
        assert_eq!(KisanError::Cache("down".to_string()).error_code(), "CACHE_ERROR");
        assert_eq!(KisanError::internal("err").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(KisanError::Database("connection lost".to_string()).is_retriable());
        assert!(KisanError::Timeout("request timed out".to_string()).is_retriable());
        assert!(!KisanError::validation("bad input").is_retriable());
        assert!(!KisanError::from(no_fallback()).is_retriable());
    }

    #[test]
    fn test_upstream_error_class() {
        assert_eq!(UpstreamError::transient("503").class(), ErrorClass::Transient);
        assert_eq!(UpstreamError::permanent("400").class(), ErrorClass::Permanent);
        assert_eq!(UpstreamError::permanent("bad request").message(), "bad request");
    }

    #[test]
    fn test_no_fallback_message_is_user_facing() {
        let message = no_fallback().to_string();
        assert!(message.contains("7-day forecast"));
        assert!(message.contains("Pune, Maharashtra"));
        assert!(message.contains("try again later"));
        assert!(!message.contains("reqwest"));
        assert!(!message.contains("Error"));
    }

    #[test]
    fn test_no_fallback_keeps_diagnostics() {
        let err = no_fallback();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error_class, ErrorClass::Transient);
        assert!(err.last_error.contains("Connect"));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = KisanError::from(no_fallback());
        let response = ErrorResponse::from_error(&err).with_trace_id("trace-123");
        assert_eq!(response.code, "NO_CACHED_DATA");
        assert!(response.message.contains("Please try again later"));
        assert_eq!(response.trace_id, Some("trace-123".to_string()));
    }
}
