//! Server error types.

use thiserror::Error;
use vellum_config::ConfigError;
use vellum_scope::ScopeError;
use vellum_store::StoreError;
use vellum_telemetry::TelemetryError;

/// Errors raised while starting or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {message}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Cause.
        message: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The store could not be prepared, e.g. an unreadable seed file.
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    /// The identity client could not be built.
    #[error("identity client setup failed: {0}")]
    Identity(#[from] ScopeError),

    /// Runtime I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Creates a bind error.
    pub fn bind(addr: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Bind {
            addr: addr.into(),
            message: message.to_string(),
        }
    }
}
