use std::time::Instant;
use tracing::info;

use crate::db::{DbError, QueryRows, SqlDatabase};
use crate::pipeline::validate::ValidatedQuery;

/// Runs a statement the validator approved and returns the full result set.
pub async fn execute(db: &dyn SqlDatabase, query: &ValidatedQuery) -> Result<QueryRows, DbError> {
    let start_time = Instant::now();
    let result = db.query(query.as_str()).await?;

    info!(
        "Query executed successfully. Row count: {}, Execution time: {}ms",
        result.rows.len(),
        start_time.elapsed().as_millis()
    );
    Ok(result)
}
