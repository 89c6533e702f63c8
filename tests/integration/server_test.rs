//! HTTP surface integration tests.
//!
//! Sends requests straight to the router without binding a socket.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use crm_insight::config::Config;
use crm_insight::db::{ColumnInfo, MockConnector, MockDatabaseClient, QueryResult, Value};
use crm_insight::error::Result;
use crm_insight::export::{Exporter, XlsxExporter};
use crm_insight::llm::MockLlmClient;
use crm_insight::server::router;
use crm_insight::service::QueryService;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(connector: MockConnector, exports: &TempDir) -> Router {
    let service = QueryService::new(
        Arc::new(Config::default()),
        Arc::new(MockLlmClient::new()),
        Arc::new(connector),
        Arc::new(XlsxExporter::new(exports.path())),
    );
    router(Arc::new(service))
}

fn counting_db() -> MockDatabaseClient {
    MockDatabaseClient::new().with_result(
        "count(*)",
        QueryResult::with_data(
            vec![ColumnInfo::new("count", "BIGINT")],
            vec![vec![Value::Int(42)]],
        ),
    )
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn db_config() -> JsonValue {
    json!({"host": "localhost", "user": "root", "password": "", "database": "crm"})
}

async fn json_body(response: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(counting_db()), &exports)
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"status": "healthy", "service": "crm-insight"})
    );
}

#[tokio::test]
async fn test_process_query_count() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(counting_db()), &exports)
        .oneshot(post_json(
            "/process-query",
            json!({"query": "How many users spend > 5000", "db_config": db_config()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"type": "count", "count": 42, "message": "Found 42 users matching your criteria"})
    );
}

#[tokio::test]
async fn test_process_query_missing_db_config() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(counting_db()), &exports)
        .oneshot(post_json("/process-query", json!({"query": "How many users"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Query and database config are required"})
    );
}

#[tokio::test]
async fn test_process_query_unreachable_database() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::unreachable(), &exports)
        .oneshot(post_json(
            "/process-query",
            json!({"query": "Users inactive for 90 days", "db_config": db_config()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Database connection failed"}));
}

#[tokio::test]
async fn test_export_query_sends_attachment() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(MockDatabaseClient::new()), &exports)
        .oneshot(post_json(
            "/process-query",
            json!({"query": "Export users who spend > 10000", "db_config": db_config()}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"campaign_results_"));
    assert!(disposition.ends_with(".xlsx\""));
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_download_previous_export() {
    let exports = TempDir::new().unwrap();
    let app = app(MockConnector::new(MockDatabaseClient::new()), &exports);

    let response = app
        .clone()
        .oneshot(post_json("/api/query", json!({"query": "Users inactive for 90 days"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let excel_file = body["data"]["excelFile"].as_str().unwrap().to_string();
    let stem = std::path::Path::new(&excel_file)
        .file_stem()
        .unwrap()
        .to_string_lossy()
        .into_owned();

    let response = app
        .oneshot(get(&format!("/download-excel/{stem}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&format!("{stem}.xlsx")));
}

#[tokio::test]
async fn test_download_missing_or_escaping_file() {
    let exports = TempDir::new().unwrap();
    let app = app(MockConnector::new(MockDatabaseClient::new()), &exports);

    for uri in ["/download-excel/nothing_here", "/download-excel/..%2Fconfig"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
        assert_eq!(json_body(response).await, json!({"error": "File not found"}));
    }
}

#[tokio::test]
async fn test_api_query_predictive() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(MockDatabaseClient::new()), &exports)
        .oneshot(post_json("/api/query", json!({"query": "Predict revenue trends"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "predictive_analytics");
    assert_eq!(body["query"], "Predict revenue trends");
    assert_eq!(body["data"]["mode"], "revenue");
}

#[tokio::test]
async fn test_api_query_requires_query() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::new(MockDatabaseClient::new()), &exports)
        .oneshot(post_json("/api/query", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let exports = TempDir::new().unwrap();
    let app = app(MockConnector::new(counting_db()), &exports);

    let not_json = Request::builder()
        .method("POST")
        .uri("/process-query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("query=How many users"))
        .unwrap();
    let no_content_type = Request::builder()
        .method("POST")
        .uri("/api/query")
        .body(Body::from(r#"{"query": "How many users"}"#))
        .unwrap();
    let wrong_port_type = post_json(
        "/process-query",
        json!({"query": "How many users", "db_config": {"database": "crm", "port": "abc"}}),
    );

    let cases = [
        (not_json, "Query and database config are required"),
        (no_content_type, "Query is required"),
        (wrong_port_type, "Query and database config are required"),
    ];
    for (request, message) in cases {
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": message }));
    }
}

struct PanickingExporter;

impl Exporter for PanickingExporter {
    fn export(&self, _result: &QueryResult, _stem: &str) -> Result<PathBuf> {
        panic!("exporter exploded");
    }

    fn locate(&self, _stem: &str) -> Result<PathBuf> {
        panic!("exporter exploded");
    }
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let service = QueryService::new(
        Arc::new(Config::default()),
        Arc::new(MockLlmClient::new()),
        Arc::new(MockConnector::new(MockDatabaseClient::new())),
        Arc::new(PanickingExporter),
    );

    let response = router(Arc::new(service))
        .oneshot(get("/download-excel/x"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_campaign_history_route() {
    let exports = TempDir::new().unwrap();
    let app = app(MockConnector::new(counting_db()), &exports);
    for query in ["How many users spend > 5000", "How many users visited twice"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/process-query",
                json!({"query": query, "db_config": db_config()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/api/campaigns")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let campaigns = body.as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0]["query_text"], "How many users visited twice");
    assert_eq!(campaigns[0]["result_count"], 42);
    assert_eq!(campaigns[1]["query_text"], "How many users spend > 5000");
    assert!(campaigns[1]["created_at"].is_string());
}

#[tokio::test]
async fn test_campaign_history_store_failure() {
    let exports = TempDir::new().unwrap();
    let response = app(MockConnector::unreachable(), &exports)
        .oneshot(get("/api/campaigns"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Database connection failed"}));
}
