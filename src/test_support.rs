//! Fixtures shared by unit tests: a seeded sales table and scripted doubles
//! for the generation service and the database.

use async_trait::async_trait;
use duckdb::Connection;
use r2d2::Pool;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::db::db_pool::{DuckDBConnectionManager, IN_MEMORY};
use crate::db::{DbError, DuckDbDatabase, QueryRows, SchemaColumn, SqlDatabase};
use crate::llm::models::CompletionRequest;
use crate::llm::retry::RetryPolicy;
use crate::llm::{LlmError, LlmManager, TextGenerator};

const SALES_TABLE: &str = "
    CREATE TABLE sales_data (
        id INTEGER PRIMARY KEY,
        product_name VARCHAR,
        category VARCHAR,
        price DOUBLE,
        quantity INTEGER,
        sales_date DATE
    );
    INSERT INTO sales_data VALUES
        (1, 'Laptop', 'Electronics', 1200.0, 2, DATE '2023-01-15'),
        (2, 'Headphones', 'Electronics', 150.0, 5, DATE '2023-03-10'),
        (3, 'Novel', 'Books', 15.0, 10, DATE '2023-04-22'),
        (4, 'Cookbook', 'Books', 30.0, 3, DATE '2023-07-08'),
        (5, 'Desk Lamp', 'Home', 45.0, 4, DATE '2023-10-05'),
        (6, 'Blender', 'Home', 80.0, 2, DATE '2024-02-14');
";

pub fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SALES_TABLE).unwrap();
    conn
}

/// Pool of one in-memory connection, so the seeded table is visible to every call.
pub fn seeded_pool() -> Pool<DuckDBConnectionManager> {
    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(Duration::from_secs(30))
        .build(DuckDBConnectionManager::new(IN_MEMORY.to_string()))
        .unwrap();
    pool.get().unwrap().execute_batch(SALES_TABLE).unwrap();
    pool
}

pub fn seeded_database() -> DuckDbDatabase {
    DuckDbDatabase::new(seeded_pool(), Duration::from_secs(10))
}

pub fn sales_schema() -> Vec<SchemaColumn> {
    [
        ("id", "INTEGER", true),
        ("product_name", "VARCHAR", false),
        ("category", "VARCHAR", false),
        ("price", "DOUBLE", false),
        ("quantity", "INTEGER", false),
        ("sales_date", "DATE", false),
    ]
    .into_iter()
    .map(|(name, data_type, is_primary_key)| SchemaColumn {
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_primary_key,
    })
    .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replays canned completions in order; errors once the script runs out.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    calls: CallCount,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: CallCount::default(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> CallCount {
        self.calls.clone()
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.bump();
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(LlmError::ResponseError("script exhausted".to_string())))
    }
}

pub fn scripted_llm(generator: ScriptedGenerator) -> Arc<LlmManager> {
    Arc::new(LlmManager::with_generator(
        Box::new(generator),
        RetryPolicy::none(),
        Duration::from_secs(10),
    ))
}

/// Wraps a database and counts calls per operation.
pub struct CountingDatabase<D = DuckDbDatabase> {
    inner: D,
    catalog_reads: CallCount,
    explains: CallCount,
    queries: CallCount,
}

impl<D: SqlDatabase> CountingDatabase<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            catalog_reads: CallCount::default(),
            explains: CallCount::default(),
            queries: CallCount::default(),
        }
    }

    pub fn catalog_reads(&self) -> usize {
        self.catalog_reads.get()
    }

    pub fn explains(&self) -> usize {
        self.explains.get()
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

#[async_trait]
impl<D: SqlDatabase> SqlDatabase for CountingDatabase<D> {
    async fn table_columns(&self, table: &str) -> Result<Vec<SchemaColumn>, DbError> {
        self.catalog_reads.bump();
        self.inner.table_columns(table).await
    }

    async fn explain(&self, sql: &str) -> Result<(), DbError> {
        self.explains.bump();
        self.inner.explain(sql).await
    }

    async fn query(&self, sql: &str) -> Result<QueryRows, DbError> {
        self.queries.bump();
        self.inner.query(sql).await
    }
}
