//! Error types for the store crate.

use std::path::PathBuf;
use thiserror::Error;
use vellum_core::VellumError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An update addressed a path that does not exist in the record.
    #[error("invalid update of '{path}': {message}")]
    InvalidUpdate {
        /// Dotted update path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Fixture data could not be loaded.
    #[error("failed to seed store from {path}: {message}")]
    Seed {
        /// Fixture file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create an invalid update error.
    pub fn invalid_update(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a seed error.
    pub fn seed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Seed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns whether the operation may succeed if retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<StoreError> for VellumError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => Self::dependency_unavailable("store", message),
            other => Self::internal_with_source("store operation failed", other),
        }
    }
}

/// Errors raised while building a query filter from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// An identifier in the request is blank.
    #[error("identifier list contains an empty value")]
    EmptyIdentifier,

    /// An identifier does not parse as a store identifier.
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    /// The date range ends before it starts.
    #[error("date range ends ({end}) before it starts ({start})")]
    InvertedRange {
        /// Range start, RFC 3339.
        start: String,
        /// Range end, RFC 3339.
        end: String,
    },
}

impl From<FilterError> for VellumError {
    fn from(err: FilterError) -> Self {
        let field = match err {
            FilterError::EmptyIdentifier | FilterError::InvalidIdentifier(_) => "ids",
            FilterError::InvertedRange { .. } => "date_range",
        };
        Self::invalid_field(field, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::ErrorCategory;

    #[test]
    fn test_unavailable_maps_to_dependency_unavailable() {
        let err: VellumError = StoreError::unavailable("connection reset").into();
        assert_eq!(err.category(), ErrorCategory::DependencyUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_update_is_internal() {
        let err: VellumError = StoreError::invalid_update("pages.9", "index out of range").into();
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_filter_error_is_invalid_request() {
        let err: VellumError = FilterError::InvalidIdentifier("zz".into()).into();
        assert_eq!(err.category(), ErrorCategory::InvalidRequest);
    }
}
