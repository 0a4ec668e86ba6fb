//! Failures of cache administration requests.
//!
//! A rejected delete, pattern clear or pre-warm request becomes an
//! [`ApiError`] whose [`ErrorCode`] picks the HTTP status. Store and executor
//! failures arrive as `HotqueryError` and are mapped here; their internal
//! reasons are logged, not echoed to the caller. "Cache not found" is a
//! normal reply, not an error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hotquery_core::{ExecutionError, HotqueryError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field value is out of valid range
    InvalidRange,

    /// Field format is incorrect
    InvalidFormat,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Key-value store operation failed
    StorageError,

    /// The warehouse rejected or failed the query
    QueryFailed,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Operation timed out
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::InternalError | ErrorCode::StorageError | ErrorCode::QueryFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidRange => "Value is out of valid range",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Cache store operation failed",
            ErrorCode::QueryFailed => "Query execution failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Operation timed out",
        }
    }

    /// Whether a client may retry the request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::ServiceUnavailable | ErrorCode::Timeout)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for admin operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create a ValidationFailed error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(field: &str, min: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("Field '{}' must be at least {}", field, min),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a Timeout error.
    pub fn timeout(operation: &str) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation '{}' timed out", operation),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Lets admin handlers return `ApiError` directly:
/// ```ignore
/// async fn handler() -> Result<AdminReply<DeleteCacheResponse>, ApiError> {
///     Err(ApiError::missing_field("hash"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<HotqueryError> for ApiError {
    fn from(err: HotqueryError) -> Self {
        let retryable = err.is_retryable();
        let api_error = match err {
            HotqueryError::Validation(ValidationError::RequiredFieldMissing { field }) => {
                ApiError::missing_field(&field)
            }
            HotqueryError::Validation(e @ ValidationError::InvalidValue { .. }) => {
                ApiError::invalid_input(e.to_string())
            }
            HotqueryError::Validation(e @ ValidationError::ConflictingFields { .. }) => {
                ApiError::validation_failed(e.to_string())
            }
            HotqueryError::Storage(e @ StorageError::InvalidPattern { .. }) => {
                ApiError::new(ErrorCode::InvalidFormat, e.to_string())
            }
            HotqueryError::Storage(StorageError::Unavailable { reason }) => {
                tracing::error!(reason = %reason, "Cache store unavailable");
                ApiError::service_unavailable("Cache store unavailable")
            }
            HotqueryError::Storage(StorageError::Timeout { operation }) => {
                tracing::error!(operation = %operation, "Cache store timed out");
                ApiError::timeout(&operation)
            }
            HotqueryError::Storage(e) => {
                tracing::error!(error = %e, "Cache store error");
                ApiError::from_code(ErrorCode::StorageError)
            }
            HotqueryError::Execution(ExecutionError::ExecutorUnavailable { reason }) => {
                tracing::error!(reason = %reason, "Query executor unavailable");
                ApiError::service_unavailable("Query executor unavailable")
            }
            HotqueryError::Execution(e) => {
                tracing::error!(error = %e, "Query execution failed");
                ApiError::new(ErrorCode::QueryFailed, e.to_string())
            }
            HotqueryError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ApiError::internal_error("Service misconfigured")
            }
        };

        if retryable {
            api_error.with_details(serde_json::json!({ "retryable": true }))
        } else {
            api_error
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
