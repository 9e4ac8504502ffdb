//! The identity lookup seam.

use crate::error::ScopeResult;
use async_trait::async_trait;
use vellum_core::{CallerId, WireMessage};

/// Source of a caller's associates.
///
/// Implementations answer with `Associate` messages. Whether the identity
/// service lives in-process or across the network is up to the implementor.
#[async_trait]
pub trait IdentityLookup: Send + Sync + 'static {
    /// Returns every associate visible to `caller`. Unknown callers have none.
    async fn list_associates(&self, caller: &CallerId) -> ScopeResult<Vec<WireMessage>>;

    /// Returns whether `caller` is the privileged identity. Must not perform
    /// I/O.
    fn is_privileged(&self, caller: &CallerId) -> bool;
}
