//! Error types for hotquery operations

use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store operation {operation} timed out")]
    Timeout { operation: String },

    #[error("Key {key} holds a {found} value, expected {expected}")]
    WrongType {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Invalid key pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Request validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Conflicting fields {field_a} and {field_b}: {reason}")]
    ConflictingFields {
        field_a: String,
        field_b: String,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors reported by the external query executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Query executor unavailable: {reason}")]
    ExecutorUnavailable { reason: String },

    #[error("Invalid executor response: {reason}")]
    InvalidResponse { reason: String },
}

/// Master error type for all hotquery errors.
#[derive(Debug, Clone, Error)]
pub enum HotqueryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl HotqueryError {
    /// Whether the caller may retry the operation unchanged.
    ///
    /// Only transient infrastructure failures qualify. Nothing in this
    /// workspace retries on its own; retry policy belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HotqueryError::Storage(StorageError::Unavailable { .. })
                | HotqueryError::Storage(StorageError::Timeout { .. })
                | HotqueryError::Execution(ExecutionError::ExecutorUnavailable { .. })
        )
    }

    /// Shorthand for a missing-field validation error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        HotqueryError::Validation(ValidationError::RequiredFieldMissing {
            field: field.into(),
        })
    }

    /// Shorthand for an invalid-value validation error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HotqueryError::Validation(ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

/// Result type alias for hotquery operations.
pub type HotqueryResult<T> = Result<T, HotqueryError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_wrong_type() {
        let err = StorageError::WrongType {
            key: "prewarm:queue".to_string(),
            expected: "list".to_string(),
            found: "string".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("prewarm:queue"));
        assert!(msg.contains("list"));
        assert!(msg.contains("string"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "redis_url".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("redis_url"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_retryable_classification() {
        let unavailable = HotqueryError::from(StorageError::Unavailable {
            reason: "connection refused".to_string(),
        });
        assert!(unavailable.is_retryable());

        let timeout = HotqueryError::from(StorageError::Timeout {
            operation: "GET".to_string(),
        });
        assert!(timeout.is_retryable());

        let executor_down = HotqueryError::from(ExecutionError::ExecutorUnavailable {
            reason: "502".to_string(),
        });
        assert!(executor_down.is_retryable());

        let validation = HotqueryError::missing_field("hash");
        assert!(!validation.is_retryable());

        let failed_query = HotqueryError::from(ExecutionError::QueryFailed {
            reason: "syntax error".to_string(),
        });
        assert!(!failed_query.is_retryable());
    }

    #[test]
    fn test_hotquery_error_from_variants() {
        let storage = HotqueryError::from(StorageError::InvalidPattern {
            pattern: "[".to_string(),
            reason: "unclosed class".to_string(),
        });
        assert!(matches!(storage, HotqueryError::Storage(_)));

        let config = HotqueryError::from(ConfigError::MissingRequired {
            field: "redis_url".to_string(),
        });
        assert!(matches!(config, HotqueryError::Config(_)));

        let validation = HotqueryError::invalid_value("topN", "must be greater than 0");
        assert!(matches!(
            validation,
            HotqueryError::Validation(ValidationError::InvalidValue { .. })
        ));
    }
}
