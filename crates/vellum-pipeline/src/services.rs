//! The full set of services one process exposes.

use crate::identity::IdentityService;
use crate::pool::WorkerPool;
use crate::profile::EntityProfile;
use crate::service::EntityService;
use std::sync::Arc;
use vellum_schema::Marshaler;
use vellum_scope::{IdentityLookup, ScopeResolver};
use vellum_store::Store;

/// Collection names, overridable per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    /// OCR documents.
    pub documents: String,
    /// Document metadata.
    pub document_info: String,
    /// Transactions.
    pub transactions: String,
    /// Users.
    pub users: String,
    /// Branch offices.
    pub branch_offices: String,
    /// Organizations.
    pub organizations: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            documents: EntityProfile::documents().collection,
            document_info: EntityProfile::document_info().collection,
            transactions: EntityProfile::transactions().collection,
            users: EntityProfile::users().collection,
            branch_offices: EntityProfile::branch_offices().collection,
            organizations: EntityProfile::organizations().collection,
        }
    }
}

/// Everything a service needs, injected once at startup.
#[derive(Clone)]
pub struct Dependencies {
    /// Record store.
    pub store: Arc<dyn Store>,
    /// Associate lookup backing scope resolution.
    pub lookup: Arc<dyn IdentityLookup>,
    /// Scope resolver over `lookup`.
    pub resolver: ScopeResolver,
    /// Record marshaler.
    pub marshaler: Marshaler,
    /// Shared admission pool.
    pub pool: WorkerPool,
}

/// The dataset, transactions and identity services.
#[derive(Debug, Clone)]
pub struct Services {
    /// `dataset` documents.
    pub documents: EntityService,
    /// `dataset` document metadata.
    pub document_info: EntityService,
    /// `transactions`.
    pub transactions: EntityService,
    /// `identity`.
    pub identity: IdentityService,
}

impl Services {
    /// Builds every service over the default collections.
    pub fn new(deps: Dependencies) -> Self {
        Self::with_collections(deps, &Collections::default())
    }

    /// Builds every service over `collections`.
    pub fn with_collections(deps: Dependencies, collections: &Collections) -> Self {
        let entity = |profile: EntityProfile, collection: &str| {
            EntityService::new(
                profile.with_collection(collection),
                Arc::clone(&deps.store),
                deps.resolver.clone(),
                deps.marshaler.clone(),
                deps.pool.clone(),
            )
        };
        let identity = IdentityService::new(
            entity(EntityProfile::users(), &collections.users),
            entity(EntityProfile::branch_offices(), &collections.branch_offices),
            entity(EntityProfile::organizations(), &collections.organizations),
            Arc::clone(&deps.store),
            Arc::clone(&deps.lookup),
            deps.pool.clone(),
        );
        Self {
            documents: entity(EntityProfile::documents(), &collections.documents),
            document_info: entity(EntityProfile::document_info(), &collections.document_info),
            transactions: entity(EntityProfile::transactions(), &collections.transactions),
            identity,
        }
    }

    /// The shared admission pool.
    pub fn pool(&self) -> &WorkerPool {
        self.documents.pool()
    }
}
