//! Mock database clients for testing.
//!
//! Provides in-memory implementations for driving the request pipeline
//! without a running MySQL server.

use super::{
    CampaignEntry, CampaignRecord, ColumnInfo, DatabaseClient, DatabaseConnector, QueryResult,
    Schema, Value,
};
use crate::analytics::CustomerActivity;
use crate::config::ConnectionConfig;
use crate::error::{CrmError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

/// A mock database client that returns predefined results.
///
/// Results are matched by a case-insensitive substring of the SQL text; the
/// first registered match wins. Clones share the recorded campaign log.
#[derive(Clone, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    results: Vec<(String, QueryResult)>,
    customers: Vec<CustomerActivity>,
    campaigns: Arc<Mutex<Vec<CampaignRecord>>>,
    executed: Arc<Mutex<Vec<String>>>,
    fail_campaign_log: bool,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema returned by introspection.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Returns `result` for any SQL containing `pattern`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.results.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Sets the customers returned by the activity join.
    pub fn with_customers(mut self, customers: Vec<CustomerActivity>) -> Self {
        self.customers = customers;
        self
    }

    /// Makes every campaign insert fail.
    pub fn with_failing_campaign_log(mut self) -> Self {
        self.fail_campaign_log = true;
        self
    }

    /// Returns the campaign entries recorded so far.
    pub fn campaigns(&self) -> Vec<CampaignEntry> {
        self.campaigns
            .lock()
            .map(|records| records.iter().map(|r| r.entry.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the SQL statements executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|sql| sql.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        let sql_lower = sql.to_lowercase();
        if let Some((_, result)) = self
            .results
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
        {
            return Ok(result.clone());
        }

        if sql_lower.trim_start().starts_with("select") {
            // Unmatched SELECT: one row echoing the statement.
            Ok(QueryResult::with_data(
                vec![ColumnInfo::new("result", "VARCHAR")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            ))
        } else {
            Ok(QueryResult::new())
        }
    }

    async fn fetch_customer_activity(&self) -> Result<Vec<CustomerActivity>> {
        Ok(self.customers.clone())
    }

    async fn record_campaign(&self, entry: &CampaignEntry) -> Result<()> {
        if self.fail_campaign_log {
            return Err(CrmError::execution("Table 'crm.campaigns' doesn't exist"));
        }
        let mut campaigns = self
            .campaigns
            .lock()
            .map_err(|_| CrmError::internal("Campaign log lock poisoned"))?;
        let id = campaigns.len() as i64 + 1;
        campaigns.push(CampaignRecord {
            id,
            entry: entry.clone(),
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn list_campaigns(&self, admin_email: &str) -> Result<Vec<CampaignRecord>> {
        let campaigns = self
            .campaigns
            .lock()
            .map_err(|_| CrmError::internal("Campaign log lock poisoned"))?;
        // Insertion order is creation order.
        Ok(campaigns
            .iter()
            .rev()
            .filter(|record| record.entry.admin_email == admin_email)
            .cloned()
            .collect())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose statements always fail.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing with the given store error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("You have an error in your SQL syntax")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(CrmError::execution(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(CrmError::execution(self.message.clone()))
    }

    async fn fetch_customer_activity(&self) -> Result<Vec<CustomerActivity>> {
        Err(CrmError::execution(self.message.clone()))
    }

    async fn record_campaign(&self, _entry: &CampaignEntry) -> Result<()> {
        Err(CrmError::execution(self.message.clone()))
    }

    async fn list_campaigns(&self, _admin_email: &str) -> Result<Vec<CampaignRecord>> {
        Err(CrmError::execution(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

enum MockTarget {
    Working(MockDatabaseClient),
    Failing(FailingDatabaseClient),
    Unreachable,
}

/// Hands out mock clients and records every connection request.
#[derive(Clone)]
pub struct MockConnector {
    target: Arc<MockTarget>,
    requests: Arc<Mutex<Vec<ConnectionConfig>>>,
}

impl MockConnector {
    /// Connects every request to a clone of `client`.
    pub fn new(client: MockDatabaseClient) -> Self {
        Self::with_target(MockTarget::Working(client))
    }

    /// Connects every request to a client whose statements fail.
    pub fn failing(client: FailingDatabaseClient) -> Self {
        Self::with_target(MockTarget::Failing(client))
    }

    /// Fails every connection attempt.
    pub fn unreachable() -> Self {
        Self::with_target(MockTarget::Unreachable)
    }

    fn with_target(target: MockTarget) -> Self {
        Self {
            target: Arc::new(target),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the configurations passed to `connect` so far.
    pub fn requests(&self) -> Vec<ConnectionConfig> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseConnector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(config.clone());
        }

        match self.target.as_ref() {
            MockTarget::Working(client) => Ok(Box::new(client.clone())),
            MockTarget::Failing(client) => Ok(Box::new(client.clone())),
            MockTarget::Unreachable => Err(CrmError::connection(format!(
                "Cannot connect to {}",
                config.display_string()
            ))),
        }
    }
}
