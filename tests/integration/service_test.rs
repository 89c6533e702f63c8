//! Request pipeline integration tests.
//!
//! Drives `QueryService` with mock text generation and mock data sources.

use std::sync::Arc;

use crm_insight::config::{Config, ConnectionConfig};
use crm_insight::db::{
    ColumnInfo, FailingDatabaseClient, MockConnector, MockDatabaseClient, QueryResult, Value,
};
use crm_insight::error::CrmError;
use crm_insight::export::XlsxExporter;
use crm_insight::llm::MockLlmClient;
use crm_insight::query::{QueryPayload, QueryResponse};
use crm_insight::service::{HandledQuery, QueryService};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Fixture {
    service: QueryService,
    db: MockDatabaseClient,
    connector: MockConnector,
    llm: MockLlmClient,
    exports: TempDir,
}

fn fixture(db: MockDatabaseClient, llm: MockLlmClient) -> Fixture {
    let exports = TempDir::new().unwrap();
    let connector = MockConnector::new(db.clone());
    let mut config = Config::default();
    config.campaign.admin_email = Some("admin@example.com".to_string());

    let service = QueryService::new(
        Arc::new(config),
        Arc::new(llm.clone()),
        Arc::new(connector.clone()),
        Arc::new(XlsxExporter::new(exports.path().join("exports"))),
    );

    Fixture {
        service,
        db,
        connector,
        llm,
        exports,
    }
}

fn request_config() -> ConnectionConfig {
    ConnectionConfig {
        host: Some("crm-db".to_string()),
        database: Some("crm".to_string()),
        user: Some("analyst".to_string()),
        password: Some("secret".to_string()),
        ..Default::default()
    }
}

fn high_spenders() -> QueryResult {
    QueryResult::with_data(
        vec![
            ColumnInfo::new("name", "VARCHAR"),
            ColumnInfo::new("email", "VARCHAR"),
            ColumnInfo::new("total_spend", "DECIMAL"),
        ],
        vec![
            vec![Value::from("Asha"), Value::from("asha@example.com"), Value::Float(12000.0)],
            vec![Value::from("Ravi"), Value::from("ravi@example.com"), Value::Float(15500.5)],
        ],
    )
}

#[tokio::test]
async fn test_tabular_query_writes_spreadsheet() {
    let db = MockDatabaseClient::new().with_result("total_spend > 10000", high_spenders());
    let f = fixture(db, MockLlmClient::new());

    let response = f
        .service
        .process_query("Users who spend > 10000 and visit < 3 times", Some(&request_config()))
        .await
        .unwrap();

    let QueryResponse::Payload(QueryPayload::Data {
        results,
        count,
        excel_file,
        message,
    }) = response
    else {
        panic!("expected a data payload, got {:?}", response);
    };
    assert_eq!(count, 2);
    assert_eq!(results[0]["name"], "Asha");
    assert_eq!(results[1]["total_spend"], 15500.5);
    assert_eq!(message, "Found 2 users. Excel file generated.");

    let path = std::path::PathBuf::from(excel_file.unwrap());
    assert!(path.is_file());
    assert!(path.starts_with(f.exports.path()));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("campaign_results_") && name.ends_with(".xlsx"));
}

#[tokio::test]
async fn test_request_uses_supplied_connection() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::new());

    f.service
        .process_query("Users inactive for 90 days", Some(&request_config()))
        .await
        .unwrap();

    assert_eq!(f.connector.requests(), vec![request_config()]);
}

#[tokio::test]
async fn test_prompt_embeds_schema_and_question() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::new());

    f.service
        .process_query("Users inactive for 90 days", Some(&request_config()))
        .await
        .unwrap();

    let prompts = f.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Users inactive for 90 days"));
    assert_eq!(
        f.db.executed(),
        vec!["SELECT * FROM customers WHERE last_active < DATE_SUB(CURDATE(), INTERVAL 90 DAY)"
            .to_string()]
    );
}

#[tokio::test]
async fn test_empty_tabular_result_is_not_an_error() {
    let db = MockDatabaseClient::new().with_result("interval 90 day", QueryResult::new());
    let f = fixture(db, MockLlmClient::new());

    let response = f
        .service
        .process_query("Users inactive for 90 days", Some(&request_config()))
        .await
        .unwrap();

    let json = match response {
        QueryResponse::Payload(payload) => serde_json::to_value(payload).unwrap(),
        other => panic!("expected payload, got {:?}", other),
    };
    assert_eq!(json["count"], 0);
    assert_eq!(json["results"], serde_json::json!([]));
    assert_eq!(json["message"], "No users found matching your criteria");
}

#[tokio::test]
async fn test_count_fallback_uses_row_length() {
    let totals = QueryResult::with_data(
        vec![ColumnInfo::new("total", "BIGINT")],
        vec![vec![Value::Int(3)]],
    );
    let llm = MockLlmClient::new()
        .with_response("kitne log", "SELECT 3 AS total FROM customers WHERE 1 = 1");
    let db = MockDatabaseClient::new().with_result("as total", totals);
    let f = fixture(db, llm);

    let response = f
        .service
        .process_query("Kitne log active hain?", Some(&request_config()))
        .await
        .unwrap();

    assert_eq!(
        response,
        QueryResponse::Payload(QueryPayload::Count {
            count: 1,
            message: "Found 1 users matching your criteria".to_string(),
        })
    );
}

#[tokio::test]
async fn test_export_query_returns_file_and_logs_campaign() {
    let db = MockDatabaseClient::new().with_result("total_spend > 10000", high_spenders());
    let f = fixture(db, MockLlmClient::new());

    let response = f
        .service
        .process_query("Export users who spend > 10000", Some(&request_config()))
        .await
        .unwrap();

    let QueryResponse::File(file) = response else {
        panic!("expected a file, got {:?}", response);
    };
    assert_eq!(file.row_count, 2);
    assert!(file.path.is_file());

    let campaigns = f.db.campaigns();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].admin_email, "admin@example.com");
    assert_eq!(campaigns[0].query_text, "Export users who spend > 10000");
    assert_eq!(campaigns[0].result_count, Some(2));

    let stem = file.filename.trim_end_matches(".xlsx");
    assert_eq!(f.service.fetch_export(stem).unwrap(), file.path);
}

#[tokio::test]
async fn test_handle_query_uses_configured_database() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::new());

    let handled = f.service.handle_query("Users inactive for 90 days").await.unwrap();

    let HandledQuery::Sql { response, .. } = &handled else {
        panic!("expected an SQL answer");
    };
    assert_eq!(response.result_count(), 1);
    assert_eq!(f.connector.requests(), vec![ConnectionConfig::default()]);
    assert!(f.db.campaigns().is_empty());

    let json = handled.envelope().unwrap();
    assert_eq!(json["type"], "sql_query");
    assert!(json["data"]["excelFile"]
        .as_str()
        .unwrap()
        .contains("query_results_"));
}

#[tokio::test]
async fn test_predictive_query_with_empty_store() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::new());

    let handled = f.service.handle_query("Customer segmentation analysis").await.unwrap();

    let json = handled.envelope().unwrap();
    assert_eq!(json["type"], "predictive_analytics");
    assert_eq!(json["data"]["mode"], "segmentation");
    assert_eq!(json["data"]["report"], "no_data");
}

#[tokio::test]
async fn test_failures_map_to_public_messages() {
    let cases: Vec<(MockConnector, MockLlmClient, &str)> = vec![
        (MockConnector::unreachable(), MockLlmClient::new(), "Database connection failed"),
        (
            MockConnector::new(MockDatabaseClient::new()),
            MockLlmClient::new().with_response("inactive", "```sql\n```"),
            "Failed to generate SQL query",
        ),
        (
            MockConnector::failing(FailingDatabaseClient::new("Unknown column 'spend'")),
            MockLlmClient::new(),
            "Query execution failed",
        ),
    ];

    for (connector, llm, expected) in cases {
        let service = QueryService::new(
            Arc::new(Config::default()),
            Arc::new(llm),
            Arc::new(connector),
            Arc::new(XlsxExporter::new(TempDir::new().unwrap().path())),
        );

        let error = service
            .process_query("Users inactive for 90 days", Some(&request_config()))
            .await
            .unwrap_err();

        assert_eq!(error.status_code(), 500);
        assert_eq!(error.public_message(), expected);
    }
}

#[tokio::test]
async fn test_missing_inputs_are_caller_errors() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::new());

    let error = f.service.process_query("", Some(&request_config())).await.unwrap_err();
    assert!(matches!(error, CrmError::ConfigMissing(_)));

    let error = f.service.handle_query("  ").await.unwrap_err();
    assert_eq!(error.status_code(), 400);
    assert!(f.connector.requests().is_empty());
}

#[tokio::test]
async fn test_failed_request_is_still_logged() {
    let f = fixture(MockDatabaseClient::new(), MockLlmClient::failing("quota"));

    let error = f
        .service
        .process_query("Users inactive for 90 days", Some(&request_config()))
        .await
        .unwrap_err();

    assert!(matches!(error, CrmError::GenerationFailed(_)));
    let campaigns = f.db.campaigns();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].admin_email, "admin@example.com");
    assert_eq!(campaigns[0].query_text, "Users inactive for 90 days");
    assert_eq!(campaigns[0].result_count, None);
}

#[tokio::test]
async fn test_campaign_history_reads_back_the_log() {
    let db = MockDatabaseClient::new().with_result("total_spend > 10000", high_spenders());
    let f = fixture(db, MockLlmClient::new());
    for query in ["Export users who spend > 10000", "Users who spend > 10000"] {
        f.service
            .process_query(query, Some(&request_config()))
            .await
            .unwrap();
    }

    let history = f.service.campaign_history().await.unwrap();

    let logged: Vec<_> = history
        .iter()
        .map(|r| (r.entry.query_text.as_str(), r.entry.result_count))
        .collect();
    assert_eq!(
        logged,
        vec![
            ("Users who spend > 10000", Some(2)),
            ("Export users who spend > 10000", Some(2)),
        ]
    );
    assert_eq!(
        f.connector.requests().last(),
        Some(&ConnectionConfig::default())
    );
}
