// Startup loading of the query table from a CSV file.
// Query connections cannot read files, so this uses its own writable connection.

use duckdb::Connection;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::db::db_pool::IN_MEMORY;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file not found: {0}")]
    MissingFile(String),
    #[error("cannot seed an in-memory database; set database.connection_string to a file")]
    InMemoryTarget,
    #[error("Database error: {0}")]
    DatabaseError(#[from] duckdb::Error),
}

/// Replaces `table_name` with the contents of the CSV at `path`, letting
/// DuckDB infer column types. Returns the number of rows loaded.
pub fn seed_table_from_csv(connection_string: &str, table_name: &str, path: &Path) -> Result<usize, IngestError> {
    if connection_string.is_empty() || connection_string == IN_MEMORY {
        return Err(IngestError::InMemoryTarget);
    }
    if !path.is_file() {
        return Err(IngestError::MissingFile(path.display().to_string()));
    }

    let conn = Connection::open(connection_string)?;
    let table = table_name.replace('"', "\"\"");
    let csv = path.to_string_lossy().replace('\'', "''");
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE \"{}\" AS SELECT * FROM read_csv_auto('{}')",
        table, csv
    ))?;

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))?;
    info!("Seeded table {} with {} rows from {}", table_name, count, path.display());
    Ok(count as usize)
}
