//! Unified error types for all layers of the application.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Stylebatch.
///
/// Variants are grouped by where they originate. Request-level problems
/// (validation, missing records) are terminal for the triggering call;
/// dependency failures are transient and are retried through queue
/// redelivery when they happen inside the worker loop.
#[derive(Error, Debug)]
pub enum BatchError {
    // ============ Domain Errors ============
    /// Malformed or missing request fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// A status change the state machine does not allow.
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Conflicting write (e.g., duplicate primary key).
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Dependency Errors ============
    /// Database unavailable or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Durable queue unavailable or rejected an operation.
    #[error("Queue error: {0}")]
    Queue(String),

    /// Artifact store unavailable or rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Any other collaborator failed mid-operation.
    #[error("Dependency error: {service} - {message}")]
    Dependency { service: String, message: String },

    /// The generation service answered with a non-success status.
    #[error("Remote generation error ({status}): {detail}")]
    RemoteGeneration { status: u16, detail: String },

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============ Queue Processing Errors ============
    /// A queue message that cannot be parsed or resolved.
    #[error("Poison message: {0}")]
    PoisonMessage(String),

    // ============ Internal Errors ============
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::InvalidTransition { .. } | Self::Conflict(_) => 409,
            Self::PoisonMessage(_) => 422,
            Self::RemoteGeneration { .. } => 502,
            Self::Database(_) | Self::Queue(_) | Self::Storage(_) | Self::Dependency { .. } => 503,
            Self::Timeout(_) => 504,
            Self::Configuration(_) | Self::Internal(_) | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Dependency { .. } => "DEPENDENCY_ERROR",
            Self::RemoteGeneration { .. } => "REMOTE_GENERATION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::PoisonMessage(_) => "POISON_MESSAGE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
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

    /// Creates a dependency error for the named collaborator.
    #[must_use]
    pub fn dependency<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Dependency {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid transition error.
    #[must_use]
    pub fn invalid_transition<F: ToString, T: ToString>(entity: &'static str, from: F, to: T) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is transient, i.e. worth another attempt
    /// through queue redelivery.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Queue(_)
                | Self::Storage(_)
                | Self::Dependency { .. }
                | Self::RemoteGeneration { .. }
                | Self::Timeout(_)
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for BatchError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // MySQL duplicate entry
                    if code == "23000" || code == "1062" {
                        return Self::Conflict(db_err.message().to_string());
                    }
                }
                Self::Database(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    /// Request trace ID for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Field-level validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `BatchError`.
    #[must_use]
    pub fn from_error(error: &BatchError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
            trace_id: None,
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets field-level validation errors.
    #[must_use]
    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&BatchError> for ErrorResponse {
    fn from(error: &BatchError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(BatchError::validation("empty style id").status_code(), 400);
        assert_eq!(BatchError::not_found("Job", 1).status_code(), 404);
        assert_eq!(BatchError::invalid_transition("work item", "done", "running").status_code(), 409);
        assert_eq!(BatchError::PoisonMessage("garbage".into()).status_code(), 422);
        assert_eq!(
            BatchError::RemoteGeneration { status: 500, detail: "boom".into() }.status_code(),
            502
        );
        assert_eq!(BatchError::Queue("down".into()).status_code(), 503);
        assert_eq!(BatchError::Timeout("slow".into()).status_code(), 504);
        assert_eq!(BatchError::internal("oops").status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BatchError::validation("x").error_code(), "VALIDATION_ERROR");
        assert_eq!(BatchError::not_found("Style", "abc").error_code(), "NOT_FOUND");
        assert_eq!(BatchError::dependency("queue", "down").error_code(), "DEPENDENCY_ERROR");
        assert_eq!(
            BatchError::RemoteGeneration { status: 429, detail: "busy".into() }.error_code(),
            "REMOTE_GENERATION_ERROR"
        );
        assert_eq!(BatchError::Storage("403".into()).error_code(), "STORAGE_ERROR");
        assert_eq!(BatchError::Configuration("bad".into()).error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_transient_errors() {
        assert!(BatchError::Database("connection lost".into()).is_transient());
        assert!(BatchError::dependency("queue", "unreachable").is_transient());
        assert!(BatchError::RemoteGeneration { status: 503, detail: String::new() }.is_transient());
        assert!(BatchError::Storage("upload failed".into()).is_transient());
    }

    #[test]
    fn test_terminal_errors() {
        assert!(!BatchError::validation("bad input").is_transient());
        assert!(!BatchError::not_found("Job", 1).is_transient());
        assert!(!BatchError::PoisonMessage("unparseable".into()).is_transient());
        assert!(!BatchError::invalid_transition("job", "cancelled", "running").is_transient());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = BatchError::invalid_transition("work item", "done", "running");
        let msg = err.to_string();
        assert!(msg.contains("work item"));
        assert!(msg.contains("done -> running"));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = BatchError::not_found("Job", "42");
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.code, "NOT_FOUND");
        assert!(response.message.contains("Job"));
        assert!(response.details.is_none());
        assert!(response.trace_id.is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let err = BatchError::validation("bad input");
        let details = vec![FieldError {
            field: "style_id".to_string(),
            message: "must not be blank".to_string(),
            code: "not_blank".to_string(),
        }];
        let response = ErrorResponse::from_error(&err)
            .with_details(details)
            .with_trace_id("trace-1");
        assert_eq!(response.details.map(|d| d.len()), Some(1));
        assert_eq!(response.trace_id.as_deref(), Some("trace-1"));
    }
}
