//! Wires a [`Server`] from a [`VellumConfig`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use vellum_config::{CollectionNames, IdentityMode, LogFormat, LoggingConfig, VellumConfig};
use vellum_pipeline::{Collections, Dependencies, Services, WorkerPool};
use vellum_schema::{catalog, Marshaler};
use vellum_scope::{
    DirectoryCollections, DirectoryLookup, HttpIdentityClient, IdentityClientConfig,
    IdentityLookup, ScopeConfig, ScopeResolver,
};
use vellum_store::{MemoryStore, Store};
use vellum_telemetry::{LogConfig, MetricsConfig};

use crate::dispatch::Dispatcher;
use crate::error::ServerResult;
use crate::server::Server;

/// Builds the server over an in-memory store, seeded from
/// `store.seed_path` when set.
pub fn build(config: &VellumConfig) -> ServerResult<Server> {
    let store = MemoryStore::new();
    if let Some(path) = &config.store.seed_path {
        let count = store.seed_file(path)?;
        info!(path = %path, records = count, "store seeded");
    }
    build_with_store(config, Arc::new(store))
}

/// Builds the server over `store`.
pub fn build_with_store(config: &VellumConfig, store: Arc<dyn Store>) -> ServerResult<Server> {
    let registry = Arc::new(catalog::standard());
    let marshaler = Marshaler::new(Arc::clone(&registry));
    let scope = ScopeConfig::new()
        .with_privileged_identity(config.scope.privileged_identity.as_str())
        .with_associate_key_field(config.scope.associate_key_field.as_str());
    let collections = collections(&config.store.collections);

    let lookup: Arc<dyn IdentityLookup> = match config.identity.mode {
        IdentityMode::Local => Arc::new(
            DirectoryLookup::new(Arc::clone(&store), marshaler.clone(), scope.clone())
                .with_collections(DirectoryCollections {
                    users: collections.users.clone(),
                    branch_offices: collections.branch_offices.clone(),
                }),
        ),
        IdentityMode::Remote => {
            let endpoint = config.identity.endpoint.clone().unwrap_or_default();
            let mut client = IdentityClientConfig::new(endpoint);
            if let Some(ms) = config.identity.timeout_ms {
                client = client.with_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = config.identity.connect_timeout_ms {
                client.connect_timeout = Duration::from_millis(ms);
            }
            info!(endpoint = %client.endpoint, "using remote identity service");
            Arc::new(HttpIdentityClient::new(
                client,
                scope.clone(),
                Arc::clone(&registry),
            )?)
        }
    };

    let resolver = ScopeResolver::new(Arc::clone(&lookup), marshaler.clone(), scope);
    let deps = Dependencies {
        store,
        lookup,
        resolver,
        marshaler,
        pool: WorkerPool::new(config.pool.max_in_flight),
    };
    let services = Services::with_collections(deps, &collections);
    Ok(Server::new(
        config.server.clone(),
        Dispatcher::new(services, registry),
        &config.telemetry.service_name,
    ))
}

/// Applies configured collection names over the defaults.
pub fn collections(names: &CollectionNames) -> Collections {
    let mut collections = Collections::default();
    let overrides = [
        (&names.documents, &mut collections.documents),
        (&names.document_info, &mut collections.document_info),
        (&names.transactions, &mut collections.transactions),
        (&names.users, &mut collections.users),
        (&names.branch_offices, &mut collections.branch_offices),
        (&names.organizations, &mut collections.organizations),
    ];
    for (name, slot) in overrides {
        if let Some(name) = name {
            slot.clone_from(name);
        }
    }
    collections
}

/// Logging settings for the telemetry crate.
pub fn log_config(logging: &LoggingConfig) -> LogConfig {
    let base = match logging.format {
        LogFormat::Json => LogConfig::production(),
        LogFormat::Pretty => LogConfig::development(),
    };
    LogConfig {
        enabled: logging.enabled,
        level: logging.level.clone(),
        file_line_info: logging.include_location,
        ..base
    }
}

/// Metrics settings for the telemetry crate.
pub fn metrics_config(metrics: &vellum_config::MetricsConfig) -> MetricsConfig {
    MetricsConfig {
        enabled: metrics.enabled,
        addr: metrics.addr.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_overrides() {
        let names = CollectionNames {
            documents: Some("ocr_documents".into()),
            ..CollectionNames::default()
        };
        let collections = collections(&names);
        assert_eq!(collections.documents, "ocr_documents");
        assert_eq!(collections.users, Collections::default().users);
    }

    #[test]
    fn test_log_config_follows_format() {
        let logging = LoggingConfig {
            format: LogFormat::Pretty,
            level: "vellum_scope=debug,info".into(),
            ..LoggingConfig::default()
        };
        let log = log_config(&logging);
        assert!(!log.json_format);
        assert_eq!(log.level, "vellum_scope=debug,info");
        assert!(!log.file_line_info);
    }

    #[test]
    fn test_remote_identity_builds_client() {
        let mut config = VellumConfig::default();
        config.identity.mode = IdentityMode::Remote;
        config.identity.endpoint = Some("http://identity.internal:8080".into());
        config.identity.timeout_ms = Some(500);
        assert!(build_with_store(&config, Arc::new(MemoryStore::new())).is_ok());
    }
}
