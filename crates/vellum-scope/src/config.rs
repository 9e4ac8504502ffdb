//! Configuration for scope resolution.

use std::time::Duration;

/// Settings shared by the resolver and its identity lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    /// The caller identity that sees every record.
    pub privileged_identity: String,
    /// Associate field whose values become the allowed owner set.
    pub associate_key_field: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            privileged_identity: "root".to_string(),
            associate_key_field: "email".to_string(),
        }
    }
}

impl ScopeConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the privileged identity.
    pub fn with_privileged_identity(mut self, identity: impl Into<String>) -> Self {
        self.privileged_identity = identity.into();
        self
    }

    /// Set the associate key field.
    pub fn with_associate_key_field(mut self, field: impl Into<String>) -> Self {
        self.associate_key_field = field.into();
        self
    }

    /// Returns whether `caller` is the privileged identity. An empty caller
    /// never is.
    pub fn is_privileged(&self, caller: &str) -> bool {
        !caller.is_empty() && caller == self.privileged_identity
    }
}

/// Settings for [`HttpIdentityClient`](crate::HttpIdentityClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClientConfig {
    /// Base URL of the identity service, e.g. `http://identity:8080`.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl Default for IdentityClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl IdentityClientConfig {
    /// Configuration pointing at `endpoint` with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a production configuration.
    pub fn production(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
        }
    }

    /// Create a development configuration.
    pub fn development(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}
