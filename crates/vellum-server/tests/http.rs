//! RPCs over a real listener, against the sample store.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use vellum_config::VellumConfig;
use vellum_server::{bootstrap, Server, ServerError, ServerResult, ShutdownSignal};
use vellum_store::fixtures;

struct TestServer {
    base: String,
    client: reqwest::Client,
    shutdown: ShutdownSignal,
    handle: JoinHandle<ServerResult<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let config = VellumConfig::default();
        let server =
            bootstrap::build_with_store(&config, Arc::new(fixtures::sample_store())).unwrap();
        Self::serve(server).await
    }

    async fn serve(server: Server) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            shutdown,
            handle,
        }
    }

    async fn call(&self, path: &str, caller: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base))
            .header("x-caller-id", caller)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }
}

async fn ndjson(response: reqwest::Response) -> Vec<Value> {
    let text = response.text().await.unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn field<'a>(items: &'a [Value], name: &str) -> Vec<&'a str> {
    items.iter().filter_map(|item| item[name].as_str()).collect()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestServer::start().await;

    let health: Value = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "vellum");

    let ready = server
        .client
        .get(format!("{}/ready", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);
    let ready: Value = ready.json().await.unwrap();
    assert_eq!(ready["ready"], true);
    assert_eq!(ready["max_in_flight"], 160);

    server.stop().await;
}

#[tokio::test]
async fn test_get_one_respects_scope() {
    let server = TestServer::start().await;

    let doc: Value = server
        .call("/dataset/getOne", "ben@acme.io", json!({"id": "doc-1"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(doc["uuid"], "doc-1");
    assert_eq!(doc["filename"], "doc-1.pdf");

    let hidden = server
        .call("/dataset/getOne", "carla@acme.io", json!({"id": "doc-1"}))
        .await;
    assert_eq!(hidden.status(), 200);
    assert_eq!(hidden.json::<Value>().await.unwrap(), json!({}));

    server.stop().await;
}

#[tokio::test]
async fn test_list_all_streams_ndjson() {
    let server = TestServer::start().await;

    let response = server.call("/dataset/listAll", "ana@acme.io", json!({})).await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "application/x-ndjson"
    );
    assert!(response.headers().contains_key("x-request-id"));
    let docs = ndjson(response).await;
    assert_eq!(field(&docs, "uuid"), ["doc-1", "doc-2"]);

    let response = server.call("/dataset/listAll", "root", json!({})).await;
    assert_eq!(field(&ndjson(response).await, "uuid"), ["doc-1", "doc-2", "doc-3"]);

    server.stop().await;
}

#[tokio::test]
async fn test_empty_body_reads_as_defaults() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(format!("{}/identity/listAssociates", server.base))
        .header("x-caller-id", "carla@acme.io")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let associates = ndjson(response).await;
    assert_eq!(field(&associates, "email"), ["carla@acme.io", "dan@acme.io"]);

    server.stop().await;
}

#[tokio::test]
async fn test_metrics_are_unary() {
    let server = TestServer::start().await;

    let report: Value = server
        .call("/transactions/getMetrics", "ana@acme.io", json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["matched"], 3);
    assert_eq!(report["matched_all_fields"], 2);

    server.stop().await;
}

#[tokio::test]
async fn test_update_document_lines_counts_rewrites() {
    let server = TestServer::start().await;

    let body = json!({
        "document_id": "doc-1",
        "lines": [
            {"uuid": "doc-1-l1", "text": "TOTAL 120.50"},
            {"uuid": "nope", "text": "x"}
        ]
    });
    let reply: Value = server
        .call("/dataset/updateDocumentLines", "ben@acme.io", body)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reply, json!({"count": 1}));

    let missing = server
        .call("/dataset/updateDocumentLines", "ben@acme.io", json!({"lines": []}))
        .await;
    assert_eq!(missing.status(), 400);

    server.stop().await;
}

#[tokio::test]
async fn test_errors_use_the_envelope() {
    let server = TestServer::start().await;
    let request_id = "0190a4d6-7b1c-7cc3-9d8e-2a52f1e4b6a1";

    let response = server
        .client
        .post(format!("{}/dataset/listAll", server.base))
        .header("x-caller-id", "ana@acme.io")
        .header("x-request-id", request_id)
        .json(&json!({
            "start_date": "2024-02-01T00:00:00Z",
            "end_date": "2024-01-01T00:00:00Z"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(response.headers()["x-request-id"], request_id);
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["error"]["code"], "INVALID_REQUEST");
    assert_eq!(envelope["error"]["retryable"], false);
    assert_eq!(envelope["request_id"], request_id);

    let malformed = server
        .client
        .post(format!("{}/dataset/getOne", server.base))
        .body("{\"id\":")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_routes_and_methods() {
    let server = TestServer::start().await;

    let missing = server.call("/dataset/deleteAll", "root", json!({})).await;
    assert_eq!(missing.status(), 404);
    let envelope: Value = missing.json().await.unwrap();
    assert_eq!(envelope["error"]["code"], "NOT_FOUND");

    let wrong_method = server
        .client
        .get(format!("{}/dataset/listAll", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 405);

    server.stop().await;
}

#[tokio::test]
async fn test_seeds_the_store_from_a_file() {
    let mut seed = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    seed.write_all(
        br#"{"documents": [{"uuid": "doc-9", "user_id": "ana@acme.io", "filename": "scan.pdf"}]}"#,
    )
    .unwrap();

    let mut config = VellumConfig::default();
    config.store.seed_path = Some(seed.path().display().to_string());
    let server = TestServer::serve(bootstrap::build(&config).unwrap()).await;

    let doc: Value = server
        .call("/dataset/getOne", "root", json!({"id": "doc-9"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(doc["filename"], "scan.pdf");

    server.stop().await;
}

#[test]
fn test_missing_seed_file_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = VellumConfig::default();
    config.store.seed_path = Some(dir.path().join("absent.json").display().to_string());
    let err = bootstrap::build(&config).unwrap_err();
    assert!(matches!(err, ServerError::Store(_)));
}
