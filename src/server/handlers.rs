//! Route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::db::CampaignRecord;
use crate::error::CrmError;
use crate::export::EXPORT_EXTENSION;
use crate::query::{ExportFile, QueryResponse};
use crate::server::error::ApiError;
use crate::service::{HandledQuery, QueryService};

/// Name reported by the health probe.
pub const SERVICE_NAME: &str = "crm-insight";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Body of `POST /process-query`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessQueryRequest {
    pub query: Option<String>,
    #[serde(alias = "dbConfig")]
    pub db_config: Option<ConnectionConfig>,
}

/// Body of `POST /api/query`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query: Option<String>,
}

/// Turns a malformed body into the same 400 a missing field gets.
fn json_body<T>(body: Result<Json<T>, JsonRejection>, message: &str) -> Result<T, ApiError> {
    match body {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(CrmError::config_missing(message).into())
        }
    }
}

pub async fn process_query(
    State(service): State<Arc<QueryService>>,
    body: Result<Json<ProcessQueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(body, "Query and database config are required")?;
    let query = request.query.unwrap_or_default();
    let response = service
        .process_query(&query, request.db_config.as_ref())
        .await?;

    match response {
        QueryResponse::File(file) => file_response(&file).await,
        QueryResponse::Payload(payload) => Ok(Json(payload).into_response()),
    }
}

pub async fn api_query(
    State(service): State<Arc<QueryService>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(body, "Query is required")?;
    let query = request.query.unwrap_or_default();
    let handled = service.handle_query(&query).await?;

    if let HandledQuery::Sql {
        response: QueryResponse::File(file),
        ..
    } = &handled
    {
        return file_response(file).await;
    }

    let body = handled
        .envelope()
        .ok_or_else(|| CrmError::internal("Response could not be serialized"))?;
    Ok(Json(body).into_response())
}

pub async fn download_excel(
    State(service): State<Arc<QueryService>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let suffix = format!(".{EXPORT_EXTENSION}");
    let stem = filename.strip_suffix(&suffix).unwrap_or(&filename);
    let path = service.fetch_export(stem)?;

    file_response(&ExportFile {
        filename: format!("{stem}{suffix}"),
        path,
        row_count: 0,
    })
    .await
}

pub async fn campaigns(
    State(service): State<Arc<QueryService>>,
) -> Result<Json<Vec<CampaignRecord>>, ApiError> {
    Ok(Json(service.campaign_history().await?))
}

pub async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn file_response(file: &ExportFile) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
        CrmError::internal(format!("Failed to read {}: {e}", file.path.display()))
    })?;
    info!("Sending {} ({} bytes)", file.filename, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}
