//! Seeding the in-memory store from extended-JSON files.

use std::io::Write;
use vellum_core::{ScopeToken, Value};
use vellum_store::{FilterBuilder, FilterFields, FilterParams, MemoryStore, Store, StoreError};

#[tokio::test]
async fn test_seeded_records_are_queryable_by_object_id() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "transaction": [
                {{"_id": {{"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}}, "user_id": "ana@acme.io",
                  "created_at": {{"$date": "2024-01-02T00:00:00Z"}}, "matches": []}},
                {{"_id": {{"$oid": "65a1f0c2e4b0a1b2c3d4e5f7"}}, "user_id": "ben@acme.io",
                  "created_at": {{"$date": "2024-01-03T00:00:00Z"}}, "matches": []}}
            ]
        }}"#
    )
    .unwrap();

    let store = MemoryStore::new();
    assert_eq!(store.seed_file(file.path()).unwrap(), 2);

    let builder = FilterBuilder::new(FilterFields {
        id: "_id".into(),
        id_is_object_id: true,
        ..FilterFields::default()
    });
    let filter = builder
        .build(
            &ScopeToken::restricted(["ana@acme.io"]),
            &FilterParams::new().with_id("65a1f0c2e4b0a1b2c3d4e5f6"),
        )
        .unwrap();
    let found = store.find_one("transaction", &filter).await.unwrap().unwrap();
    assert_eq!(found.get("user_id"), Some(&Value::from("ana@acme.io")));
    assert!(matches!(found.get("created_at"), Some(Value::DateTime(_))));
}

#[test]
fn test_malformed_seed_file_names_the_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"documents\": 3}}").unwrap();

    let err = MemoryStore::new().seed_file(file.path()).unwrap_err();
    match err {
        StoreError::Seed { path, .. } => assert_eq!(path, file.path()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_seed_file_is_io_error() {
    let err = MemoryStore::new()
        .seed_file("/definitely/not/here.json")
        .unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}
