//! Database abstraction layer for crm-insight.
//!
//! Provides a trait-based interface for the relational store, so the request
//! pipeline can run against MySQL or an in-memory mock interchangeably.

mod mock;
mod mysql;
mod schema;
mod types;

pub use mock::{FailingDatabaseClient, MockConnector, MockDatabaseClient};
pub use mysql::{MySqlClient, MySqlConnector};
pub use schema::{Column, ForeignKey, Schema, Table};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::analytics::CustomerActivity;
use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the campaign log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignEntry {
    /// Operator address recorded with the query.
    pub admin_email: String,
    /// The natural-language query as submitted.
    pub query_text: String,
    /// Number of matching customers, when known.
    pub result_count: Option<i64>,
}

/// A stored campaign log row, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: CampaignEntry,
    pub created_at: Option<DateTime<Utc>>,
}

/// Trait defining the interface for database clients.
///
/// A client wraps exactly one connection, owned by one request.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes one SQL statement and returns its rows.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Loads every customer joined with their aggregated orders.
    async fn fetch_customer_activity(&self) -> Result<Vec<CustomerActivity>>;

    /// Appends one entry to the campaign log.
    async fn record_campaign(&self, entry: &CampaignEntry) -> Result<()>;

    /// Lists the campaign log of one operator, newest first.
    async fn list_campaigns(&self, admin_email: &str) -> Result<Vec<CampaignRecord>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Opens request-scoped database clients.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Opens a fresh connection described by `config`.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}
