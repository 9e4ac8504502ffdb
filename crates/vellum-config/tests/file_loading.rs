//! Loading configuration files from disk.

use std::io::Write;
use tempfile::NamedTempFile;
use vellum_config::{ConfigError, ConfigLoader, IdentityMode, LogFormat};

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_loads_toml_file() {
    let file = file_with(
        ".toml",
        r#"
        [server]
        http_addr = "127.0.0.1:9000"

        [pool]
        max_in_flight = 20

        [identity]
        mode = "remote"
        endpoint = "http://identity.internal:8080"
        timeout_ms = 1500

        [store.collections]
        documents = "ocr_documents"

        [telemetry.logging]
        level = "vellum_scope=debug,info"
        format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.server.http_addr, "127.0.0.1:9000");
    assert_eq!(config.pool.max_in_flight, 20);
    assert_eq!(config.pool.worker_threads, 32);
    assert_eq!(config.identity.mode, IdentityMode::Remote);
    assert_eq!(config.identity.timeout_ms, Some(1500));
    assert_eq!(config.store.collections.documents.as_deref(), Some("ocr_documents"));
    assert_eq!(config.store.collections.users, None);
    assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
}

#[test]
fn test_loads_json_file() {
    let file = file_with(
        ".json",
        r#"{"scope": {"privileged_identity": "admin@acme.io"}, "store": {"seed_path": "seed.json"}}"#,
    );
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.scope.privileged_identity, "admin@acme.io");
    assert_eq!(config.scope.associate_key_field, "email");
    assert_eq!(config.store.seed_path.as_deref(), Some("seed.json"));
}

#[test]
fn test_unknown_field_is_rejected() {
    let file = file_with(".toml", "[pool]\nthreads = 4\n");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::TomlError(_)));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vellum.toml");

    let err = ConfigLoader::new().with_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));

    let config = ConfigLoader::new().with_optional_file(&path).unwrap().load().unwrap();
    assert_eq!(config.pool.max_in_flight, 160);
}

#[test]
fn test_unsupported_extension() {
    let file = file_with(".yaml", "pool: {}");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

#[test]
fn test_invalid_values_fail_validation() {
    let file = file_with(".toml", "[server]\nhttp_addr = \"not-an-address\"\n");
    let loader = ConfigLoader::new().with_file(file.path()).unwrap();
    let err = loader.load().unwrap_err();
    assert!(err.to_string().contains("server.http_addr"));
}

#[test]
fn test_env_overrides_file() {
    let file = file_with(".toml", "[pool]\nmax_in_flight = 20\n");
    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("VELLUM")
        .with_vars([("VELLUM__POOL__MAX_IN_FLIGHT", "40")])
        .load()
        .unwrap();
    assert_eq!(config.pool.max_in_flight, 40);
}
