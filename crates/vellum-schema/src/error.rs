//! Marshaling errors.

use thiserror::Error;
use vellum_core::VellumError;

/// Result type for marshaling operations.
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Errors raised while converting between records and wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// A field's runtime shape does not match its declared kind.
    #[error("field '{path}' expected {expected}, found {found}")]
    KindMismatch {
        /// Dotted path of the field, with list indices.
        path: String,
        /// What the schema declares.
        expected: String,
        /// What was actually there.
        found: String,
    },

    /// No schema is registered for the message type.
    #[error("unknown message type '{0}'")]
    UnknownMessage(String),

    /// A nested message carries a different type than the schema declares.
    #[error("field '{path}' expected message type {expected}, found {found}")]
    WrongMessageType {
        /// Dotted path of the field.
        path: String,
        /// Declared nested type.
        expected: String,
        /// Actual nested type.
        found: String,
    },

    /// A timestamp could not be represented as an instant.
    #[error("field '{path}' holds an out-of-range timestamp")]
    InvalidTimestamp {
        /// Dotted path of the field.
        path: String,
    },

    /// JSON input was not an object where a message was expected.
    #[error("expected a JSON object for message {message}")]
    NotAnObject {
        /// The message type being read.
        message: String,
    },

    /// A nested type referenced by a field has no schema.
    #[error("field '{field}' of {message} references unregistered type {target}")]
    DanglingReference {
        /// Message holding the field.
        message: String,
        /// Field name.
        field: String,
        /// Missing nested type.
        target: String,
    },
}

impl MarshalError {
    pub(crate) fn mismatch(
        path: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::KindMismatch {
            path: path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Dotted path of the offending field, if the error concerns one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::KindMismatch { path, .. }
            | Self::WrongMessageType { path, .. }
            | Self::InvalidTimestamp { path } => Some(path),
            _ => None,
        }
    }
}

impl From<MarshalError> for VellumError {
    fn from(err: MarshalError) -> Self {
        match &err {
            MarshalError::KindMismatch { path, .. }
            | MarshalError::WrongMessageType { path, .. }
            | MarshalError::InvalidTimestamp { path } => {
                let path = path.clone();
                Self::schema_mismatch_at(path, err.to_string())
            }
            MarshalError::NotAnObject { .. } => Self::invalid_request(err.to_string()),
            MarshalError::UnknownMessage(_) | MarshalError::DanglingReference { .. } => {
                Self::internal_with_source("schema registry is incomplete", err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::ErrorCategory;

    #[test]
    fn test_kind_mismatch_maps_to_schema_mismatch() {
        let err: VellumError = MarshalError::mismatch("pages", "nested list", "string").into();
        assert_eq!(err.category(), ErrorCategory::SchemaMismatch);
        assert!(err.to_string().contains("pages"));
    }

    #[test]
    fn test_unknown_message_is_internal() {
        let err: VellumError = MarshalError::UnknownMessage("Ghost".into()).into();
        assert_eq!(err.category(), ErrorCategory::Internal);
    }
}
