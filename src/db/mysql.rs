//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! for MySQL databases using sqlx. Each client owns a single connection that
//! lives for one request; nothing is pooled or retried.

use crate::analytics::CustomerActivity;
use crate::config::ConnectionConfig;
use crate::db::{
    CampaignEntry, CampaignRecord, Column, ColumnInfo, DatabaseClient, DatabaseConnector,
    ForeignKey, QueryResult, Row, Schema, Table, Value,
};
use crate::error::{CrmError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column as SqlxColumn, Connection, Decode, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

const CUSTOMER_ACTIVITY_SQL: &str = r#"
    SELECT
        c.id,
        c.name,
        c.email,
        c.visits,
        c.last_active,
        c.total_spend,
        COUNT(o.id) AS order_count,
        AVG(o.spend) AS avg_order_value
    FROM customers c
    LEFT JOIN orders o ON o.customer_id = c.id
    GROUP BY c.id, c.name, c.email, c.visits, c.last_active, c.total_spend
    ORDER BY c.id
"#;

const INSERT_CAMPAIGN_SQL: &str =
    "INSERT INTO campaigns (admin_email, query_text, result_count) VALUES (?, ?, ?)";

const LIST_CAMPAIGNS_SQL: &str = r#"
    SELECT
        id,
        CAST(admin_email AS CHAR),
        CAST(query_text AS CHAR),
        result_count,
        created_at
    FROM campaigns
    WHERE admin_email = ?
    ORDER BY created_at DESC
"#;

/// MySQL database client.
pub struct MySqlClient {
    conn: Mutex<Option<MySqlConnection>>,
}

impl MySqlClient {
    /// Opens a single connection described by `config`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let database = config.require_database()?;

        let mut options = MySqlConnectOptions::new()
            .host(config.host.as_deref().unwrap_or("localhost"))
            .port(config.port)
            .database(database);
        if let Some(user) = config.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = config.password.as_deref() {
            options = options.password(password);
        }

        debug!("Connecting to {}", config.display_string());
        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

/// Opens [`MySqlClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl DatabaseConnector for MySqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let client = MySqlClient::connect(config).await?;
        Ok(Box::new(client))
    }
}

fn closed() -> CrmError {
    CrmError::execution("Database connection is closed")
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let tables = fetch_tables(conn).await?;
        let foreign_keys = fetch_foreign_keys(conn).await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let start = Instant::now();
        let result: Vec<MySqlRow> = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| CrmError::execution(format_query_error(e)))?;
        debug!(
            "Query returned {} rows in {:?}",
            result.len(),
            start.elapsed()
        );

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => column_info(first_row.columns()),
            // Empty result: read column metadata from the prepared statement.
            None => match (&mut *conn).prepare(sql).await {
                Ok(statement) => column_info(statement.columns()),
                Err(_) => Vec::new(),
            },
        };

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows))
    }

    async fn fetch_customer_activity(&self) -> Result<Vec<CustomerActivity>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let rows: Vec<MySqlRow> = sqlx::query(CUSTOMER_ACTIVITY_SQL)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                CrmError::execution(format!(
                    "Failed to load customer data: {}",
                    format_query_error(e)
                ))
            })?;

        Ok(rows.iter().map(activity_from_row).collect())
    }

    async fn record_campaign(&self, entry: &CampaignEntry) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        sqlx::query(INSERT_CAMPAIGN_SQL)
            .bind(&entry.admin_email)
            .bind(&entry.query_text)
            .bind(entry.result_count)
            .execute(&mut *conn)
            .await
            .map_err(|e| CrmError::execution(format_query_error(e)))?;

        Ok(())
    }

    async fn list_campaigns(&self, admin_email: &str) -> Result<Vec<CampaignRecord>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let rows: Vec<MySqlRow> = sqlx::query(LIST_CAMPAIGNS_SQL)
            .bind(admin_email)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                CrmError::execution(format!(
                    "Failed to fetch campaigns: {}",
                    format_query_error(e)
                ))
            })?;

        Ok(rows.iter().map(campaign_from_row).collect())
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| CrmError::connection(e.to_string()))?;
        }
        Ok(())
    }
}

/// Fetches all base tables of the connected database.
async fn fetch_tables(conn: &mut MySqlConnection) -> Result<Vec<Table>> {
    let table_names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT CAST(table_name AS CHAR)
        FROM information_schema.tables
        WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| CrmError::execution(format!("Failed to fetch tables: {e}")))?;

    let mut tables = Vec::with_capacity(table_names.len());

    for table_name in table_names {
        let rows: Vec<(String, String, String, Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(column_type AS CHAR),
                CAST(is_nullable AS CHAR),
                CAST(column_default AS CHAR),
                CAST(column_key AS CHAR)
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(&table_name)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            CrmError::execution(format!("Failed to fetch columns for {table_name}: {e}"))
        })?;

        let mut table = Table::new(table_name);
        for (name, data_type, is_nullable, default, key) in rows {
            if key == "PRI" {
                table.primary_key.push(name.clone());
            }
            table.columns.push(Column {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                default,
            });
        }
        tables.push(table);
    }

    Ok(tables)
}

/// Fetches all foreign key relationships, one entry per constraint.
async fn fetch_foreign_keys(conn: &mut MySqlConnection) -> Result<Vec<ForeignKey>> {
    let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT
            CAST(constraint_name AS CHAR),
            CAST(table_name AS CHAR),
            CAST(column_name AS CHAR),
            CAST(referenced_table_name AS CHAR),
            CAST(referenced_column_name AS CHAR)
        FROM information_schema.key_column_usage
        WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL
        ORDER BY table_name, constraint_name, ordinal_position
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| CrmError::execution(format!("Failed to fetch foreign keys: {e}")))?;

    let mut keys: Vec<(String, ForeignKey)> = Vec::new();
    for (constraint, from_table, from_column, to_table, to_column) in rows {
        match keys.last_mut() {
            Some((name, fk)) if *name == constraint && fk.from_table == from_table => {
                fk.from_columns.push(from_column);
                fk.to_columns.push(to_column);
            }
            _ => keys.push((
                constraint,
                ForeignKey::new(from_table, vec![from_column], to_table, vec![to_column]),
            )),
        }
    }

    Ok(keys.into_iter().map(|(_, fk)| fk).collect())
}

fn column_info<C: SqlxColumn>(columns: &[C]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes a nullable column without the driver's strict type check.
fn decode<'r, T>(row: &'r MySqlRow, index: usize) -> Option<T>
where
    T: Decode<'r, MySql>,
{
    row.try_get_unchecked::<Option<T>, _>(index).ok().flatten()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "BOOLEAN" => decode::<bool>(row, index).map(Value::Bool),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            decode::<i64>(row, index).map(Value::Int)
        }

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => decode::<u64>(row, index).map(|v| match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Float(v as f64),
        }),

        "FLOAT" => decode::<f32>(row, index).map(|v| Value::Float(v as f64)),

        "DOUBLE" => decode::<f64>(row, index).map(Value::Float),

        // DECIMAL arrives as text; render it as a number.
        "DECIMAL" => decode::<String>(row, index).map(|s| match s.parse::<f64>() {
            Ok(v) => Value::Float(v),
            Err(_) => Value::String(s),
        }),

        "DATETIME" | "TIMESTAMP" => decode::<NaiveDateTime>(row, index)
            .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),

        "DATE" => decode::<NaiveDate>(row, index).map(|d| Value::String(d.to_string())),

        "TIME" => decode::<NaiveTime>(row, index).map(|t| Value::String(t.to_string())),

        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => decode::<Vec<u8>>(row, index).map(Value::Bytes),

        // VARCHAR, CHAR, TEXT, ENUM, SET, JSON
        _ => decode::<String>(row, index).map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

/// Decodes a DATETIME, TIMESTAMP or DATE column.
fn decode_timestamp(row: &MySqlRow, index: usize) -> Option<NaiveDateTime> {
    match row.columns().get(index)?.type_info().name() {
        "DATE" => decode::<NaiveDate>(row, index)?.and_hms_opt(0, 0, 0),
        _ => decode::<NaiveDateTime>(row, index),
    }
}

/// Builds one customer activity record from the join query.
fn activity_from_row(row: &MySqlRow) -> CustomerActivity {
    let values = convert_row(row);
    let at = |i: usize| values.get(i).cloned().unwrap_or(Value::Null);

    CustomerActivity {
        id: at(0).as_i64().unwrap_or_default(),
        name: text(at(1)),
        email: text(at(2)),
        visits: at(3).as_i64(),
        last_active: decode_timestamp(row, 4).map(|dt| dt.and_utc()),
        total_spend: at(5).as_f64().unwrap_or(0.0),
        order_count: at(6).as_i64().unwrap_or(0),
        avg_order_value: at(7).as_f64(),
    }
}

fn campaign_from_row(row: &MySqlRow) -> CampaignRecord {
    let values = convert_row(row);
    let at = |i: usize| values.get(i).cloned().unwrap_or(Value::Null);

    CampaignRecord {
        id: at(0).as_i64().unwrap_or_default(),
        entry: CampaignEntry {
            admin_email: text(at(1)),
            query_text: text(at(2)),
            result_count: at(3).as_i64(),
        },
        created_at: decode_timestamp(row, 4).map(|dt| dt.and_utc()),
    }
}

fn text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_display_string(),
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> CrmError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        CrmError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        CrmError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        CrmError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        CrmError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        CrmError::connection(error.to_string())
    }
}

/// Formats a query error with the server's error number if available.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql_error) => {
                format!("ERROR {}: {}", mysql_error.number(), mysql_error.message())
            }
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
