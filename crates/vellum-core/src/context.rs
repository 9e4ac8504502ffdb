//! Request context types.
//!
//! A [`RequestContext`] is created by the transport for every incoming call
//! and carried through scope resolution, querying and marshaling.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use vellum_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID, e.g. one read from a header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The identity a call is made on behalf of.
///
/// Callers are identified by a plain string (an email address in the
/// identity directory). An empty identifier is a legal value that denotes a
/// missing identity; scope resolution treats it as "sees nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Creates a caller id. Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self(id.trim().to_string())
    }

    /// The missing identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no identity was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifier suitable for logs.
    #[must_use]
    pub fn log_id(&self) -> &str {
        if self.0.is_empty() {
            "anonymous"
        } else {
            &self.0
        }
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.log_id())
    }
}

impl From<&str> for CallerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CallerId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Per-call context.
///
/// # Example
///
/// ```
/// use vellum_core::{CallerId, RequestContext};
///
/// let ctx = RequestContext::new("dataset", "listAll").with_caller(CallerId::new("ana@acme.io"));
/// assert_eq!(ctx.operation(), "listAll");
/// assert_eq!(ctx.caller().as_str(), "ana@acme.io");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    caller: CallerId,
    service: String,
    operation: String,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context for an operation with a fresh request ID and an
    /// anonymous caller.
    #[must_use]
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            caller: CallerId::anonymous(),
            service: service.into(),
            operation: operation.into(),
            started_at: Instant::now(),
        }
    }

    /// Creates a context for tests.
    #[must_use]
    pub fn mock(caller: impl Into<CallerId>) -> Self {
        Self::new("test", "test").with_caller(caller.into())
    }

    /// Returns a new context with the specified request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns a new context with the specified caller.
    #[must_use]
    pub fn with_caller(mut self, caller: CallerId) -> Self {
        self.caller = caller;
        self
    }

    /// Replaces the caller.
    pub fn set_caller(&mut self, caller: CallerId) {
        self.caller = caller;
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller.
    #[must_use]
    pub const fn caller(&self) -> &CallerId {
        &self.caller
    }

    /// Returns the service name (`dataset`, `transactions`, ...).
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the operation name (`getOne`, `listAll`, ...).
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the elapsed time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_caller_id_trims_and_detects_empty() {
        assert!(CallerId::new("   ").is_empty());
        assert_eq!(CallerId::new(" ana@acme.io ").as_str(), "ana@acme.io");
        assert_eq!(CallerId::anonymous().to_string(), "anonymous");
    }

    #[test]
    fn test_request_context_builder() {
        let ctx = RequestContext::new("transactions", "getMetrics").with_caller("root".into());
        assert_eq!(ctx.service(), "transactions");
        assert_eq!(ctx.operation(), "getMetrics");
        assert_eq!(ctx.caller().as_str(), "root");
    }

    #[test]
    fn test_request_context_defaults_to_anonymous() {
        let ctx = RequestContext::new("dataset", "getOne");
        assert!(ctx.caller().is_empty());
    }
}
