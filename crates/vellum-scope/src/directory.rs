//! Identity lookup backed by the directory collections of a [`Store`].

use crate::config::ScopeConfig;
use crate::error::ScopeResult;
use crate::lookup::IdentityLookup;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::sync::Arc;
use tracing::debug;
use vellum_core::{CallerId, Record, WireMessage};
use vellum_schema::{catalog, Marshaler};
use vellum_store::{FindOptions, Predicate, QueryFilter, SortKey, Store};

/// Collection names the directory reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCollections {
    /// Users collection.
    pub users: String,
    /// Branch offices collection.
    pub branch_offices: String,
}

impl Default for DirectoryCollections {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            branch_offices: "branch_offices".to_string(),
        }
    }
}

/// Resolves associates by walking user → branch office → branch users.
///
/// The caller must be a visible user whose branch office exists. Every user
/// of that branch office is an associate, the caller included.
#[derive(Clone)]
pub struct DirectoryLookup {
    store: Arc<dyn Store>,
    marshaler: Marshaler,
    collections: DirectoryCollections,
    config: ScopeConfig,
}

impl std::fmt::Debug for DirectoryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryLookup")
            .field("collections", &self.collections)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectoryLookup {
    /// Creates a lookup over `store` with default collection names.
    pub fn new(store: Arc<dyn Store>, marshaler: Marshaler, config: ScopeConfig) -> Self {
        Self {
            store,
            marshaler,
            collections: DirectoryCollections::default(),
            config,
        }
    }

    /// Overrides the collection names.
    pub fn with_collections(mut self, collections: DirectoryCollections) -> Self {
        self.collections = collections;
        self
    }

    async fn caller_branch(&self, caller: &CallerId) -> ScopeResult<Option<String>> {
        let filter = QueryFilter::all()
            .and(Predicate::eq("email", caller.as_str()))
            .and(Predicate::eq("visible", true));
        let Some(user) = self.store.find_one(&self.collections.users, &filter).await? else {
            return Ok(None);
        };
        let Some(branch) = user
            .get("branch_office_uuid")
            .and_then(|v| v.as_str())
            .filter(|b| !b.is_empty())
        else {
            return Ok(None);
        };

        let filter = QueryFilter::all().and(Predicate::eq("uuid", branch));
        let office = self
            .store
            .find_one(&self.collections.branch_offices, &filter)
            .await?;
        Ok(office.map(|_| branch.to_string()))
    }
}

#[async_trait]
impl IdentityLookup for DirectoryLookup {
    async fn list_associates(&self, caller: &CallerId) -> ScopeResult<Vec<WireMessage>> {
        if caller.is_empty() {
            return Ok(Vec::new());
        }
        let Some(branch) = self.caller_branch(caller).await? else {
            debug!(caller = %caller.log_id(), "caller has no branch office");
            return Ok(Vec::new());
        };

        let filter = QueryFilter::all().and(Predicate::eq("branch_office_uuid", branch.as_str()));
        let options = FindOptions::new().sorted_by(SortKey::ascending("email"));
        let users: Vec<Record> = self
            .store
            .find_many(&self.collections.users, &filter, options)
            .await?
            .try_collect()
            .await?;

        let mut associates = Vec::with_capacity(users.len());
        for user in &users {
            let mut associate = Record::new();
            for field in ["uuid", "email"] {
                if let Some(value) = user.get(field) {
                    associate.insert(field, value.clone());
                }
            }
            associates.push(self.marshaler.encode(&associate, catalog::ASSOCIATE)?);
        }
        debug!(branch = %branch, associates = associates.len(), "associates resolved");
        Ok(associates)
    }

    fn is_privileged(&self, caller: &CallerId) -> bool {
        self.config.is_privileged(caller.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_store::fixtures;

    fn lookup() -> DirectoryLookup {
        DirectoryLookup::new(
            Arc::new(fixtures::directory_store()),
            Marshaler::new(Arc::new(catalog::standard())),
            ScopeConfig::default(),
        )
    }

    fn emails(associates: &[WireMessage]) -> Vec<&str> {
        associates.iter().filter_map(|a| a.get_str("email")).collect()
    }

    #[tokio::test]
    async fn test_branch_users_are_associates() {
        let associates = lookup()
            .list_associates(&CallerId::new("ana@acme.io"))
            .await
            .unwrap();
        assert_eq!(emails(&associates), vec!["ana@acme.io", "ben@acme.io"]);
        assert!(associates.iter().all(|a| a.type_name() == catalog::ASSOCIATE));
    }

    #[tokio::test]
    async fn test_hidden_users_still_count_as_associates() {
        let associates = lookup()
            .list_associates(&CallerId::new("carla@acme.io"))
            .await
            .unwrap();
        assert_eq!(emails(&associates), vec!["carla@acme.io", "dan@acme.io"]);
    }

    #[tokio::test]
    async fn test_hidden_caller_has_no_associates() {
        let associates = lookup()
            .list_associates(&CallerId::new("dan@acme.io"))
            .await
            .unwrap();
        assert!(associates.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_caller_has_no_associates() {
        let associates = lookup()
            .list_associates(&CallerId::new("mallory@evil.io"))
            .await
            .unwrap();
        assert!(associates.is_empty());
    }

    #[test]
    fn test_privilege_follows_config() {
        let lookup = lookup();
        assert!(lookup.is_privileged(&CallerId::new("root")));
        assert!(!lookup.is_privileged(&CallerId::new("ana@acme.io")));
    }
}
