//! Error types for scope resolution.

use thiserror::Error;
use vellum_core::VellumError;
use vellum_schema::MarshalError;
use vellum_store::StoreError;

/// Result type for scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur while resolving a caller's scope.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScopeError {
    /// The identity service could not be reached.
    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    /// The identity service refused the request.
    #[error("identity service rejected the lookup with status {status}: {message}")]
    IdentityRejected {
        /// HTTP status returned.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The identity service answered with something unreadable.
    #[error("invalid identity response: {0}")]
    InvalidResponse(String),

    /// An associate entry did not match its schema.
    #[error("associate entry rejected: {0}")]
    Marshal(#[from] MarshalError),

    /// The directory store failed.
    #[error("directory lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl ScopeError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::IdentityUnavailable(message.into())
    }

    /// Check if this is a retryable error.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::IdentityUnavailable(_) => true,
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ScopeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::IdentityUnavailable(err.to_string())
        }
    }
}

impl From<ScopeError> for VellumError {
    fn from(err: ScopeError) -> Self {
        if err.is_retryable() {
            return Self::dependency_unavailable("identity", err.to_string());
        }
        match err {
            ScopeError::Marshal(inner) => inner.into(),
            other => Self::internal_with_source("scope resolution failed", other),
        }
    }
}
