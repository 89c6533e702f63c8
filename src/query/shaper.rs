//! Result shaping.
//!
//! Turns a row set into the response payload for its intent. Spreadsheet
//! write failures never fail the response: the payload goes out with a
//! `null` file path instead.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::db::QueryResult;
use crate::export::{timestamped_stem, Exporter};
use crate::query::Intent;

/// JSON payload answering a translated question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryPayload {
    /// A single number.
    Count { count: i64, message: String },
    /// Matching rows with a spreadsheet reference.
    Data {
        results: Vec<JsonValue>,
        count: usize,
        #[serde(rename = "excelFile")]
        excel_file: Option<String>,
        message: String,
    },
    /// No matching rows.
    #[serde(rename = "data")]
    NoData {
        results: Vec<JsonValue>,
        count: usize,
        message: String,
    },
}

impl QueryPayload {
    /// Number of matching records the payload reports.
    pub fn result_count(&self) -> i64 {
        match self {
            Self::Count { count, .. } => *count,
            Self::Data { count, .. } | Self::NoData { count, .. } => *count as i64,
        }
    }
}

/// A spreadsheet ready to be sent as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    /// File name including extension.
    pub filename: String,
    pub row_count: usize,
}

/// Shaped response for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Payload(QueryPayload),
    File(ExportFile),
}

impl QueryResponse {
    /// Number of matching records, used for the campaign log.
    pub fn result_count(&self) -> i64 {
        match self {
            Self::Payload(payload) => payload.result_count(),
            Self::File(file) => file.row_count as i64,
        }
    }
}

/// Builds response payloads, delegating file creation to an [`Exporter`].
pub struct ResultShaper<'a> {
    exporter: &'a dyn Exporter,
    stem_prefix: &'a str,
}

impl<'a> ResultShaper<'a> {
    /// `stem_prefix` names exported files, e.g. `campaign_results`.
    pub fn new(exporter: &'a dyn Exporter, stem_prefix: &'a str) -> Self {
        Self {
            exporter,
            stem_prefix,
        }
    }

    /// Shapes `result` for `intent`.
    pub fn shape(&self, intent: Intent, result: &QueryResult) -> QueryResponse {
        match intent {
            Intent::Count => QueryResponse::Payload(count_payload(result)),
            Intent::Export => match self.export(result) {
                Some(path) => QueryResponse::File(ExportFile {
                    filename: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    path,
                    row_count: result.row_count(),
                }),
                None => QueryResponse::Payload(self.data_payload(result, None)),
            },
            // Predictive questions are answered by the analytics engine; a
            // translated predictive question is shaped like a tabular one.
            Intent::Tabular | Intent::Predictive => {
                if result.is_empty() {
                    QueryResponse::Payload(no_data_payload())
                } else {
                    let path = self.export(result);
                    QueryResponse::Payload(self.data_payload(result, path))
                }
            }
        }
    }

    fn export(&self, result: &QueryResult) -> Option<PathBuf> {
        let stem = timestamped_stem(self.stem_prefix);
        match self.exporter.export(result, &stem) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Spreadsheet export failed, continuing without file: {}", e);
                None
            }
        }
    }

    fn data_payload(&self, result: &QueryResult, path: Option<PathBuf>) -> QueryPayload {
        if result.is_empty() {
            return no_data_payload();
        }
        let count = result.row_count();
        let message = if path.is_some() {
            format!("Found {count} users. Excel file generated.")
        } else {
            format!("Found {count} users.")
        };
        QueryPayload::Data {
            results: result.to_json_rows(),
            count,
            excel_file: path.map(|p| p.to_string_lossy().into_owned()),
            message,
        }
    }
}

fn no_data_payload() -> QueryPayload {
    QueryPayload::NoData {
        results: Vec::new(),
        count: 0,
        message: "No users found matching your criteria".to_string(),
    }
}

/// Builds the count payload.
pub fn count_payload(result: &QueryResult) -> QueryPayload {
    let count = extract_count(result);
    QueryPayload::Count {
        count,
        message: format!("Found {count} users matching your criteria"),
    }
}

/// Reads the count from the first row.
///
/// Prefers a column named exactly `count`, then any column whose name
/// contains "count". Falls back to the number of rows when no such column
/// holds a number. The fallback also fires for a tabular result that was
/// classified as a count question, in which case it reports the row count.
pub fn extract_count(result: &QueryResult) -> i64 {
    let exact = result
        .columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case("count"));
    let fuzzy = || {
        result
            .columns
            .iter()
            .position(|c| c.name.to_lowercase().contains("count"))
    };

    exact
        .or_else(fuzzy)
        .and_then(|index| result.rows.first()?.get(index)?.as_i64())
        .unwrap_or(result.row_count() as i64)
}
