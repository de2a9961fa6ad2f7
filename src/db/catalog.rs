use duckdb::Connection;
use tracing::debug;

use super::{DbError, SchemaColumn};

/// Reads the column list of `table` from the DuckDB catalog, in ordinal order.
pub fn read_table_columns(conn: &Connection, table: &str) -> Result<Vec<SchemaColumn>, DbError> {
    let query = format!(
        "SELECT name, type, pk FROM pragma_table_info('{}') ORDER BY cid",
        table.replace('\'', "''")
    );

    let mut stmt = conn.prepare(&query)?;
    let columns = stmt
        .query_map([], |row| {
            Ok(SchemaColumn {
                name: row.get(0)?,
                data_type: row.get(1)?,
                is_primary_key: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(DbError::MissingTable(table.to_string()));
    }

    debug!("Read {} columns for table {}", columns.len(), table);
    Ok(columns)
}
