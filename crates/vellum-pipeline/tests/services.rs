//! End-to-end service calls over the sample store.

use futures_util::StreamExt;
use std::sync::Arc;
use vellum_core::{
    CallerId, ErrorCategory, Record, RequestContext, Value, VellumResult, WireMessage, WireValue,
};
use vellum_pipeline::{
    Dependencies, GetManyRequest, ListRequest, MetricsRequest, Services, WireStream, WorkerPool,
};
use vellum_schema::{catalog, Marshaler};
use vellum_scope::{DirectoryLookup, IdentityLookup, ScopeConfig, ScopeResolver};
use vellum_store::{fixtures, MemoryStore, Predicate, QueryFilter, Store};

fn services_with_pool(store: Arc<MemoryStore>, pool: WorkerPool) -> Services {
    let marshaler = Marshaler::new(Arc::new(catalog::standard()));
    let config = ScopeConfig::default();
    let store: Arc<dyn Store> = store;
    let lookup: Arc<dyn IdentityLookup> = Arc::new(DirectoryLookup::new(
        Arc::clone(&store),
        marshaler.clone(),
        config.clone(),
    ));
    let resolver = ScopeResolver::new(Arc::clone(&lookup), marshaler.clone(), config);
    Services::new(Dependencies {
        store,
        lookup,
        resolver,
        marshaler,
        pool,
    })
}

fn services(store: Arc<MemoryStore>) -> Services {
    services_with_pool(store, WorkerPool::new(8))
}

fn as_caller(caller: &str) -> RequestContext {
    RequestContext::mock(CallerId::new(caller))
}

async fn drain(stream: VellumResult<WireStream>) -> Vec<WireMessage> {
    stream
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await
}

fn uuids(messages: &[WireMessage]) -> Vec<&str> {
    messages.iter().filter_map(|m| m.get_str("uuid")).collect()
}

fn line_edit(uuid: &str, text: &str) -> WireMessage {
    WireMessage::new(catalog::LINE_EDIT)
        .with("uuid", WireValue::String(uuid.to_string()))
        .with("text", WireValue::String(text.to_string()))
}

#[tokio::test]
async fn test_caller_lists_only_branch_documents() {
    let services = services(Arc::new(fixtures::sample_store()));
    let docs = drain(
        services
            .documents
            .list_all(&as_caller("ana@acme.io"), &ListRequest::default())
            .await,
    )
    .await;
    // doc-4 has no pages yet
    assert_eq!(uuids(&docs), ["doc-1", "doc-2"]);

    let unprocessed = services
        .documents
        .get_one(&as_caller("ana@acme.io"), "doc-4")
        .await
        .unwrap();
    assert_eq!(unprocessed.get_str("uuid"), Some("doc-4"));
    assert!(!unprocessed.has("pages"));
}

#[tokio::test]
async fn test_root_lists_every_populated_document() {
    let services = services(Arc::new(fixtures::sample_store()));
    let docs = drain(
        services
            .documents
            .list_all(&as_caller("root"), &ListRequest::default())
            .await,
    )
    .await;
    assert_eq!(uuids(&docs), ["doc-1", "doc-2", "doc-3"]);
}

#[tokio::test]
async fn test_out_of_scope_get_one_is_empty() {
    let services = services(Arc::new(fixtures::sample_store()));
    let hidden = services
        .documents
        .get_one(&as_caller("carla@acme.io"), "doc-1")
        .await
        .unwrap();
    assert!(hidden.is_empty());
    assert_eq!(hidden.type_name(), catalog::DOCUMENT);

    let visible = services
        .documents
        .get_one(&as_caller("ben@acme.io"), "doc-1")
        .await
        .unwrap();
    assert_eq!(visible.get_str("uuid"), Some("doc-1"));
}

#[tokio::test]
async fn test_stranger_gets_nothing() {
    let services = services(Arc::new(fixtures::sample_store()));
    let docs = drain(
        services
            .documents
            .list_all(&as_caller("mallory@evil.io"), &ListRequest::default())
            .await,
    )
    .await;
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_marshaling_error_ends_the_stream() {
    let store = Arc::new(fixtures::directory_store());
    store.insert_many(
        fixtures::DOCUMENT_INFO,
        [
            fixtures::document_info("a", "ana@acme.io", 0, fixtures::jan(20)),
            fixtures::document_info("b", "ana@acme.io", 0, fixtures::jan(21)).with("verified", 3),
            fixtures::document_info("c", "ana@acme.io", 0, fixtures::jan(22)),
        ],
    );
    let services = services(store);

    let items: Vec<_> = services
        .document_info
        .list_all(&as_caller("root"), &ListRequest::default())
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().get_str("uuid"), Some("a"));
    let err = items[1].as_ref().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SchemaMismatch);
}

#[tokio::test]
async fn test_projection_without_values_still_emits_the_record() {
    let store = Arc::new(fixtures::directory_store());
    let id = store
        .insert(
            fixtures::TRANSACTIONS,
            Record::new()
                .with("user_id", "ana@acme.io")
                .with("invoice_number", "F-7")
                .with("created_at", fixtures::jan(6)),
        )
        .unwrap();
    let services = services(store);
    let request = GetManyRequest {
        ids: vec![id.to_hex()],
        fields: vec!["branch".into()],
    };

    let found = drain(
        services
            .transactions
            .get_many(&as_caller("ben@acme.io"), &request)
            .await,
    )
    .await;
    assert_eq!(found.len(), 1);
    assert!(found[0].is_empty());
    assert_eq!(found[0].type_name(), catalog::TRANSACTION);
}

#[tokio::test]
async fn test_get_many_intersects_ids_with_scope() {
    let services = services(Arc::new(fixtures::sample_store()));
    let request = GetManyRequest {
        ids: vec!["doc-3".into(), "doc-1".into(), "missing".into()],
        fields: Vec::new(),
    };
    let docs = drain(
        services
            .document_info
            .get_many(&as_caller("ana@acme.io"), &request)
            .await,
    )
    .await;
    assert_eq!(uuids(&docs), ["doc-1"]);
}

#[tokio::test]
async fn test_list_filters_on_match_presence() {
    let services = services(Arc::new(fixtures::sample_store()));
    let ctx = as_caller("ana@acme.io");

    let matched = ListRequest {
        with_matches: Some(true),
        ..ListRequest::default()
    };
    let docs = drain(services.document_info.list_all(&ctx, &matched).await).await;
    assert_eq!(uuids(&docs), ["doc-1"]);

    let unmatched = ListRequest {
        with_matches: Some(false),
        ..ListRequest::default()
    };
    let docs = drain(services.document_info.list_all(&ctx, &unmatched).await).await;
    assert_eq!(uuids(&docs), ["doc-2", "doc-4"]);
}

#[tokio::test]
async fn test_list_pages_before_skipping_unpopulated() {
    let services = services(Arc::new(fixtures::sample_store()));
    let request = ListRequest {
        skip: 1,
        limit: Some(2),
        ..ListRequest::default()
    };
    let docs = drain(
        services
            .document_info
            .list_all(&as_caller("root"), &request)
            .await,
    )
    .await;
    assert_eq!(uuids(&docs), ["doc-2", "doc-3"]);
}

#[tokio::test]
async fn test_list_rejects_inverted_window() {
    let services = services(Arc::new(fixtures::sample_store()));
    let request = ListRequest {
        start_date: Some(fixtures::jan(10)),
        end_date: Some(fixtures::jan(1)),
        ..ListRequest::default()
    };
    let err = services
        .documents
        .list_all(&as_caller("root"), &request)
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), ErrorCategory::InvalidRequest);
}

#[tokio::test]
async fn test_transaction_metrics_grade_every_quality_field() {
    let services = services(Arc::new(fixtures::sample_store()));

    let report = services
        .transactions
        .get_metrics(&as_caller("ana@acme.io"), &MetricsRequest::default())
        .await
        .unwrap();
    assert_eq!(
        (report.total, report.matched, report.matched_all_fields),
        (3, 3, 2)
    );

    let january_first_half = MetricsRequest {
        start_date: None,
        end_date: Some(fixtures::jan(10)),
    };
    let report = services
        .transactions
        .get_metrics(&as_caller("root"), &january_first_half)
        .await
        .unwrap();
    assert_eq!(
        (report.total, report.matched, report.matched_all_fields),
        (3, 2, 1)
    );
}

#[tokio::test]
async fn test_dataset_metrics_without_quality_rule() {
    let services = services(Arc::new(fixtures::sample_store()));
    let report = services
        .document_info
        .get_metrics(&as_caller("root"), &MetricsRequest::default())
        .await
        .unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.matched, 2);
    assert_eq!(report.matched_all_fields, report.matched);
}

#[tokio::test]
async fn test_transaction_ids_are_object_ids() {
    let store = Arc::new(fixtures::sample_store());
    let id = store
        .insert(
            fixtures::TRANSACTIONS,
            fixtures::transaction("ana@acme.io", "F-9", Some("A"), fixtures::jan(6)),
        )
        .unwrap();
    let services = services(Arc::clone(&store));

    let found = services
        .transactions
        .get_one(&as_caller("ben@acme.io"), &id.to_hex())
        .await
        .unwrap();
    assert_eq!(found.get_str("invoice_number"), Some("F-9"));

    let err = services
        .transactions
        .get_one(&as_caller("ben@acme.io"), "not-an-object-id")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidRequest);
}

#[tokio::test]
async fn test_transaction_listing_uses_summary_projection() {
    let services = services(Arc::new(fixtures::sample_store()));
    let listed = drain(
        services
            .transactions
            .list_all(&as_caller("carla@acme.io"), &ListRequest::default())
            .await,
    )
    .await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].get_str("invoice_number"), Some("F-3"));
    assert!(!listed[0].has("client_number"));
}

#[tokio::test]
async fn test_update_lines_rewrites_known_lines_only() {
    let store = Arc::new(fixtures::sample_store());
    let services = services(Arc::clone(&store));
    let edits = [line_edit("doc-1-l1", "TOTAL 120.50"), line_edit("nope", "x")];

    let count = services
        .documents
        .update_document_lines(&as_caller("ben@acme.io"), "doc-1", &edits)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let filter = QueryFilter::all().and(Predicate::eq("uuid", "doc-1"));
    let doc = store
        .find_one(fixtures::DOCUMENTS, &filter)
        .await
        .unwrap()
        .unwrap();
    let texts = doc.lookup_path("pages.areas.paragraphs.lines.text");
    assert_eq!(texts, [&Value::from("line 0"), &Value::from("TOTAL 120.50")]);
}

#[tokio::test]
async fn test_update_lines_outside_scope_is_a_no_op() {
    let store = Arc::new(fixtures::sample_store());
    let services = services(Arc::clone(&store));
    let count = services
        .documents
        .update_document_lines(
            &as_caller("carla@acme.io"),
            "doc-1",
            &[line_edit("doc-1-l0", "hijacked")],
        )
        .await
        .unwrap();
    assert_eq!(count, 0);

    let filter = QueryFilter::all().and(Predicate::eq("uuid", "doc-1"));
    let doc = store
        .find_one(fixtures::DOCUMENTS, &filter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        doc.lookup_path("pages.areas.paragraphs.lines.text")[0],
        &Value::from("line 0")
    );
}

#[tokio::test]
async fn test_update_lines_requires_line_uuid() {
    let services = services(Arc::new(fixtures::sample_store()));
    let edit = WireMessage::new(catalog::LINE_EDIT).with("text", WireValue::String("x".into()));
    let err = services
        .documents
        .update_document_lines(&as_caller("ana@acme.io"), "doc-1", &[edit])
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidRequest);
}

#[tokio::test]
async fn test_store_outage_fails_closed() {
    let store = Arc::new(fixtures::sample_store());
    let services = services(Arc::clone(&store));
    store.set_unavailable(true);

    let err = services
        .documents
        .list_all(&as_caller("ana@acme.io"), &ListRequest::default())
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), ErrorCategory::DependencyUnavailable);
    assert!(err.is_retryable());

    let err = services
        .documents
        .get_one(&as_caller("ana@acme.io"), "doc-1")
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_identity_reads_are_visible_only() {
    let services = services(Arc::new(fixtures::sample_store()));
    let ctx = as_caller("mallory@evil.io");

    let ana = services.identity.get_user(&ctx, "u-ana").await.unwrap();
    assert_eq!(ana.get_str("email"), Some("ana@acme.io"));

    let dan = services.identity.get_user(&ctx, "u-dan").await.unwrap();
    assert!(dan.is_empty());

    let orgs = drain(
        services
            .identity
            .list_organizations(&ctx, &ListRequest::default())
            .await,
    )
    .await;
    assert_eq!(uuids(&orgs), ["org-acme"]);
}

#[tokio::test]
async fn test_branch_offices_come_from_the_organization() {
    let services = services(Arc::new(fixtures::sample_store()));
    let ctx = as_caller("ana@acme.io");

    let offices = drain(services.identity.list_branch_offices(&ctx, "acme.io").await).await;
    assert_eq!(uuids(&offices), ["bo-north", "bo-south"]);
    assert_eq!(offices[0].get_str("name"), Some("north"));
    assert!(!offices[0].has("organization_uuid"));

    let none = drain(services.identity.list_branch_offices(&ctx, "evil.io").await).await;
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_associates_follow_the_branch() {
    let services = services(Arc::new(fixtures::sample_store()));
    let associates = drain(
        services
            .identity
            .list_associates(&as_caller("root"), &CallerId::new("carla@acme.io"))
            .await,
    )
    .await;
    let emails: Vec<_> = associates.iter().filter_map(|m| m.get_str("email")).collect();
    assert_eq!(emails, ["carla@acme.io", "dan@acme.io"]);
}

#[tokio::test]
async fn test_open_streams_hold_their_permit() {
    let services = services_with_pool(Arc::new(fixtures::sample_store()), WorkerPool::new(1));
    let ctx = as_caller("root");

    let stream = services
        .documents
        .list_all(&ctx, &ListRequest::default())
        .await
        .unwrap();
    let err = services.documents.get_one(&ctx, "doc-1").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(services.pool().in_flight(), 1);

    drop(stream);
    assert_eq!(services.pool().in_flight(), 0);
    assert!(services.documents.get_one(&ctx, "doc-1").await.is_ok());
}
