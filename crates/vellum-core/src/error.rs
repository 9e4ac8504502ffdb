//! Error types for Vellum services.
//!
//! [`VellumError`] is the taxonomy every service call reports through. Crate
//! level errors (marshaling, scope resolution, store access) convert into it
//! at the pipeline boundary.
//!
//! | Category | HTTP status | Retryable |
//! |---|---|---|
//! | `NotFound` | 404 | no |
//! | `SchemaMismatch` | 422 | no |
//! | `DependencyUnavailable` | 503 | yes |
//! | `InvalidRequest` | 400 | no |
//! | `Internal` | 500 | no |
//!
//! Lookup-by-id operations never raise `NotFound`; they answer with an empty
//! message. The variant exists for routing and transport failures.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`VellumError`].
pub type VellumResult<T> = Result<T, VellumError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The addressed route or resource does not exist.
    NotFound,
    /// A field's declared kind does not match its runtime shape.
    SchemaMismatch,
    /// The identity service or the store could not be reached.
    DependencyUnavailable,
    /// Malformed request parameters.
    InvalidRequest,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SchemaMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the category name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::SchemaMismatch => "schema_mismatch",
            Self::DependencyUnavailable => "dependency_unavailable",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        }
    }
}

/// Standard error type for Vellum service calls.
///
/// # Example
///
/// ```
/// use vellum_core::{ErrorCategory, VellumError};
///
/// fn parse_limit(raw: i64) -> Result<u64, VellumError> {
///     u64::try_from(raw).map_err(|_| VellumError::invalid_request("limit must be positive"))
/// }
///
/// let err = parse_limit(-1).unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::InvalidRequest);
/// ```
#[derive(Error, Debug)]
pub enum VellumError {
    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
    },

    /// A field did not have the shape its schema declares.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Human-readable error message.
        message: String,
        /// Dotted path of the offending field.
        field: Option<String>,
    },

    /// A required dependency could not be reached.
    #[error("Dependency unavailable: {message}")]
    DependencyUnavailable {
        /// Human-readable error message.
        message: String,
        /// The name of the dependency (`identity`, `store`).
        dependency: Option<String>,
    },

    /// The request parameters were malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// The request parameter at fault.
        field: Option<String>,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl VellumError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
        }
    }

    /// Creates a not found error naming the resource type.
    #[must_use]
    pub fn not_found_resource(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self::NotFound {
            message: format!("{resource_type} not found"),
            resource_type: Some(resource_type),
        }
    }

    /// Creates a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a schema mismatch error for a specific field.
    #[must_use]
    pub fn schema_mismatch_at(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a dependency unavailable error.
    #[must_use]
    pub fn dependency_unavailable(
        dependency: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DependencyUnavailable {
            message: message.into(),
            dependency: Some(dependency.into()),
        }
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: None,
        }
    }

    /// Creates an invalid request error for a specific parameter.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::SchemaMismatch { .. } => ErrorCategory::SchemaMismatch,
            Self::DependencyUnavailable { .. } => ErrorCategory::DependencyUnavailable,
            Self::InvalidRequest { .. } => ErrorCategory::InvalidRequest,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns whether a client may retry the call unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable { .. })
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                retryable: self.is_retryable(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::DependencyUnavailable { .. } => "DEPENDENCY_UNAVAILABLE",
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound {
                resource_type: Some(rt),
                ..
            } => Some(serde_json::json!({ "resource_type": rt })),
            Self::SchemaMismatch {
                field: Some(field), ..
            }
            | Self::InvalidRequest {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            Self::DependencyUnavailable {
                dependency: Some(dep),
                ..
            } => Some(serde_json::json!({ "dependency": dep })),
            _ => None,
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Whether the client may retry.
    pub retryable: bool,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
