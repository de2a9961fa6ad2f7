pub mod catalog;
pub mod db_pool;
pub mod rows;

use async_trait::async_trait;
use duckdb::Connection;
use r2d2::Pool;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::db::db_pool::DuckDBConnectionManager;

/// One column of the target table as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
}

/// A materialized result set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Query(#[from] duckdb::Error),
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("table {0} does not exist or has no columns")]
    MissingTable(String),
    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
    #[error("database task failed: {0}")]
    Task(String),
    #[error("failed to encode result rows: {0}")]
    Encode(String),
}

/// The database operations the pipeline depends on.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Catalog metadata for `table`, ordered by column position.
    async fn table_columns(&self, table: &str) -> Result<Vec<SchemaColumn>, DbError>;

    /// Plans `sql` without running it; errors when the planner rejects it.
    async fn explain(&self, sql: &str) -> Result<(), DbError>;

    /// Runs `sql` and returns all rows.
    async fn query(&self, sql: &str) -> Result<QueryRows, DbError>;
}

/// `SqlDatabase` backed by a pool of DuckDB connections.
pub struct DuckDbDatabase {
    pool: Pool<DuckDBConnectionManager>,
    timeout: Duration,
}

impl DuckDbDatabase {
    pub fn new(pool: Pool<DuckDBConnectionManager>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    // DuckDB calls block, so each one runs on the blocking pool with its own connection.
    // DuckDB offers no statement interrupt here: after a timeout the statement keeps
    // running and holds its connection until it finishes. Later checkouts wait at most
    // the pool's connection_timeout and then fail with `DbError::Pool`.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            op(&*conn)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DbError::Task(join_err.to_string())),
            Err(_) => Err(DbError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl SqlDatabase for DuckDbDatabase {
    async fn table_columns(&self, table: &str) -> Result<Vec<SchemaColumn>, DbError> {
        let table = table.to_string();
        self.with_connection(move |conn| catalog::read_table_columns(conn, &table))
            .await
    }

    async fn explain(&self, sql: &str) -> Result<(), DbError> {
        debug!("Dry-running SQL: {}", sql);
        let sql = sql.to_string();
        self.with_connection(move |conn| rows::explain(conn, &sql)).await
    }

    async fn query(&self, sql: &str) -> Result<QueryRows, DbError> {
        let sql = sql.to_string();
        self.with_connection(move |conn| rows::query_rows(conn, &sql))
            .await
    }
}
