//! Statement execution.
//!
//! Runs exactly one generated statement on a request-scoped connection.
//! Failures are terminal for the request and never retried.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{CrmError, Result};

/// Executes generated SQL against one connection.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    /// Executes `sql` and returns its rows in store order.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        let start = Instant::now();
        let result = self.db.execute_query(sql).await;
        let execution_time = start.elapsed();

        match result {
            Ok(result) => {
                info!(
                    "Query returned {} rows in {:?}",
                    result.row_count(),
                    execution_time
                );
                Ok(QueryOutcome {
                    result,
                    execution_time,
                })
            }
            Err(e) => {
                warn!("Query failed after {:?}: {}", execution_time, e);
                Err(match e {
                    CrmError::ExecutionFailed(_) | CrmError::ConnectionFailed(_) => e,
                    other => CrmError::execution(other.to_string()),
                })
            }
        }
    }
}

/// Successful query execution outcome.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query result.
    pub result: QueryResult,
    /// How long the query took to execute.
    pub execution_time: Duration,
}
