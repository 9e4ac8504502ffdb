//! Turns a caller identity into a [`ScopeToken`].

use crate::config::ScopeConfig;
use crate::error::ScopeResult;
use crate::lookup::IdentityLookup;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use vellum_core::{CallerId, ScopeToken};
use vellum_schema::Marshaler;

/// Resolves the access scope of a caller.
///
/// Resolution is fail-closed: any lookup failure is returned as an error and
/// never widens the scope. Tokens are not cached; each call resolves afresh.
#[derive(Clone)]
pub struct ScopeResolver {
    lookup: Arc<dyn IdentityLookup>,
    marshaler: Marshaler,
    config: ScopeConfig,
}

impl std::fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScopeResolver {
    /// Creates a resolver.
    pub fn new(lookup: Arc<dyn IdentityLookup>, marshaler: Marshaler, config: ScopeConfig) -> Self {
        Self {
            lookup,
            marshaler,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Resolves `caller`.
    ///
    /// - an empty caller gets a scope that admits nothing
    /// - the privileged identity gets [`ScopeToken::Unrestricted`] without a
    ///   lookup
    /// - everyone else gets the key field of each associate
    #[instrument(skip(self), fields(caller = %caller.log_id()))]
    pub async fn resolve(&self, caller: &CallerId) -> ScopeResult<ScopeToken> {
        if caller.is_empty() {
            debug!("empty caller, nothing visible");
            return Ok(ScopeToken::nobody());
        }
        if self.lookup.is_privileged(caller) {
            debug!("privileged caller");
            return Ok(ScopeToken::Unrestricted);
        }

        let associates = self.lookup.list_associates(caller).await?;
        let mut owners = BTreeSet::new();
        for associate in &associates {
            let record = self.marshaler.decode(associate)?;
            if let Some(key) = record
                .get(&self.config.associate_key_field)
                .and_then(|v| v.as_str())
                .filter(|k| !k.is_empty())
            {
                owners.insert(key.to_string());
            }
        }
        debug!(owners = owners.len(), "scope resolved");
        Ok(ScopeToken::RestrictedTo(owners))
    }
}
