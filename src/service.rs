//! The request pipeline.
//!
//! [`QueryService`] owns the injected collaborators (text generation, data
//! source connector and exporter) and runs one stateless pipeline per
//! question. Every request opens its own connection and closes it before
//! returning.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsEngine, AnalyticsOutcome};
use crate::config::{Config, ConnectionConfig};
use crate::db::{
    CampaignEntry, CampaignRecord, DatabaseClient, DatabaseConnector, MySqlConnector, Schema,
};
use crate::error::{CrmError, Result};
use crate::export::{Exporter, XlsxExporter};
use crate::llm::{create_client, LlmClient};
use crate::query::{Intent, QueryExecutor, QueryResponse, QueryTranslator, ResultShaper};

/// File stem prefix for `process_query` exports.
pub const CAMPAIGN_EXPORT_PREFIX: &str = "campaign_results";

/// File stem prefix for `handle_query` exports.
pub const QUERY_EXPORT_PREFIX: &str = "query_results";

/// Response wrapper for `handle_query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEnvelope<T> {
    pub data: T,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<T> QueryEnvelope<T> {
    fn predictive(query: &str, data: T) -> Self {
        Self {
            data,
            query: query.to_string(),
            kind: "predictive_analytics",
        }
    }

    fn sql(query: &str, data: T) -> Self {
        Self {
            data,
            query: query.to_string(),
            kind: "sql_query",
        }
    }
}

/// Outcome of `handle_query`.
#[derive(Debug, Clone, PartialEq)]
pub enum HandledQuery {
    /// Answered by the analytics engine.
    Predictive(QueryEnvelope<AnalyticsOutcome>),
    /// Answered with SQL; export questions carry a file instead of JSON.
    Sql {
        query: String,
        response: QueryResponse,
    },
}

impl HandledQuery {
    /// The JSON envelope, or `None` when the answer is a file download.
    pub fn envelope(&self) -> Option<serde_json::Value> {
        let value = match self {
            Self::Predictive(envelope) => serde_json::to_value(envelope),
            Self::Sql {
                query,
                response: QueryResponse::Payload(payload),
            } => serde_json::to_value(QueryEnvelope::sql(query, payload)),
            Self::Sql {
                response: QueryResponse::File(_),
                ..
            } => return None,
        };
        value.ok()
    }
}

/// Runs natural-language questions against the CRM database.
#[derive(Clone)]
pub struct QueryService {
    config: Arc<Config>,
    llm: Arc<dyn LlmClient>,
    connector: Arc<dyn DatabaseConnector>,
    exporter: Arc<dyn Exporter>,
}

impl QueryService {
    /// Creates a service from explicit collaborators.
    pub fn new(
        config: Arc<Config>,
        llm: Arc<dyn LlmClient>,
        connector: Arc<dyn DatabaseConnector>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            config,
            llm,
            connector,
            exporter,
        }
    }

    /// Creates a service with the configured provider, MySQL and `.xlsx` export.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::from(create_client(&config.llm)?);
        let exporter = Arc::new(XlsxExporter::new(config.server.export_dir.clone()));
        Ok(Self::new(config, llm, Arc::new(MySqlConnector), exporter))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Answers a question against a caller-supplied data source.
    ///
    /// Every call that reaches the data source is recorded in the campaign
    /// log on a best-effort basis, failed ones without a result count.
    pub async fn process_query(
        &self,
        query: &str,
        db_config: Option<&ConnectionConfig>,
    ) -> Result<QueryResponse> {
        let query = query.trim();
        let db_config = match db_config {
            Some(db_config) if !query.is_empty() => db_config,
            _ => {
                return Err(CrmError::config_missing(
                    "Query and database config are required",
                ))
            }
        };

        info!("Processing query against {}", db_config.display_string());
        let db = self.connector.connect(db_config).await?;
        let result = self
            .answer_with_sql(db.as_ref(), query, CAMPAIGN_EXPORT_PREFIX)
            .await;

        let result_count = result.as_ref().ok().map(QueryResponse::result_count);
        self.record_campaign(db.as_ref(), query, result_count).await;
        close_quietly(db.as_ref()).await;

        result
    }

    /// Answers a question against the process-configured data source.
    ///
    /// Predictive questions go to the analytics engine, everything else
    /// through SQL.
    pub async fn handle_query(&self, query: &str) -> Result<HandledQuery> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CrmError::config_missing("Query is required"));
        }

        let intent = Intent::classify(query);
        info!("Handling {} query", intent);

        if intent == Intent::Predictive {
            let outcome = self.analyze(query).await?;
            return Ok(HandledQuery::Predictive(QueryEnvelope::predictive(
                query, outcome,
            )));
        }

        let db = self.connector.connect(&self.config.database).await?;
        let result = self
            .answer_with_sql(db.as_ref(), query, QUERY_EXPORT_PREFIX)
            .await;
        close_quietly(db.as_ref()).await;

        Ok(HandledQuery::Sql {
            query: query.to_string(),
            response: result?,
        })
    }

    /// Runs the analytics engine over the process-configured data source.
    pub async fn analyze(&self, query: &str) -> Result<AnalyticsOutcome> {
        let db = self.connector.connect(&self.config.database).await?;
        let activity = db.fetch_customer_activity().await;
        close_quietly(db.as_ref()).await;

        let activity = activity?;
        debug!("Loaded {} customers for analytics", activity.len());
        Ok(AnalyticsEngine::at_current_time().run(query, &activity))
    }

    /// Lists the configured operator's campaign log, newest first.
    pub async fn campaign_history(&self) -> Result<Vec<CampaignRecord>> {
        let db = self.connector.connect(&self.config.database).await?;
        let records = db.list_campaigns(self.config.campaign.admin_email()).await;
        close_quietly(db.as_ref()).await;
        records
    }

    /// Finds a previously exported spreadsheet by file stem.
    pub fn fetch_export(&self, stem: &str) -> Result<PathBuf> {
        self.exporter.locate(stem)
    }

    async fn answer_with_sql(
        &self,
        db: &dyn DatabaseClient,
        query: &str,
        export_prefix: &str,
    ) -> Result<QueryResponse> {
        let intent = Intent::classify(query);
        let schema = schema_context(db).await;

        let sql = QueryTranslator::new(Arc::clone(&self.llm))
            .translate(query, &schema)
            .await?;
        info!("Generated SQL: {}", sql);

        let outcome = QueryExecutor::new(db).execute(&sql).await?;

        let shaper = ResultShaper::new(self.exporter.as_ref(), export_prefix);
        Ok(shaper.shape(intent, &outcome.result))
    }

    async fn record_campaign(
        &self,
        db: &dyn DatabaseClient,
        query: &str,
        result_count: Option<i64>,
    ) {
        let entry = CampaignEntry {
            admin_email: self.config.campaign.admin_email().to_string(),
            query_text: query.to_string(),
            result_count,
        };
        if let Err(e) = db.record_campaign(&entry).await {
            warn!("Failed to record campaign query: {}", e);
        }
    }
}

/// Introspects the live schema, falling back to the built-in CRM tables.
async fn schema_context(db: &dyn DatabaseClient) -> Schema {
    match db.introspect_schema().await {
        Ok(schema) if !schema.is_empty() => schema,
        Ok(_) => Schema::crm_default(),
        Err(e) => {
            warn!("Schema introspection failed, using built-in schema: {}", e);
            Schema::crm_default()
        }
    }
}

async fn close_quietly(db: &dyn DatabaseClient) {
    if let Err(e) = db.close().await {
        warn!("Failed to close database connection: {}", e);
    }
}
