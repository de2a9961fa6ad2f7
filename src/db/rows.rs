use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder;
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use serde_json::{Map, Value};

use super::{DbError, QueryRows};

/// Asks the planner for `sql` without producing result rows.
pub fn explain(conn: &Connection, sql: &str) -> Result<(), DbError> {
    let mut stmt = conn.prepare(&format!("EXPLAIN {}", sql))?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

/// Runs `sql` and returns every row as a JSON object keyed by column name.
pub fn query_rows(conn: &Connection, sql: &str) -> Result<QueryRows, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let arrow_batch = stmt.query_arrow([])?;
    let schema = arrow_batch.get_schema();

    let columns = schema
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect::<Vec<String>>();

    let record_batches: Vec<RecordBatch> = arrow_batch.collect();
    let rows = batches_to_json(&record_batches)?;

    Ok(QueryRows { columns, rows })
}

fn batches_to_json(batches: &[RecordBatch]) -> Result<Vec<Map<String, Value>>, DbError> {
    if batches.iter().all(|batch| batch.num_rows() == 0) {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());

    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer
        .write_batches(&refs)
        .map_err(|e| DbError::Encode(e.to_string()))?;
    writer.finish().map_err(|e| DbError::Encode(e.to_string()))?;

    let buffer = writer.into_inner();
    serde_json::from_slice(&buffer).map_err(|e| DbError::Encode(e.to_string()))
}
