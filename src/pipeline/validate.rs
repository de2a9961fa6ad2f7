//! The read-only gate every statement passes before it reaches the database.
//!
//! Checks run in a fixed order and the first failure is reported:
//!
//! 1. the statement starts with `SELECT`;
//! 2. no denylisted keyword appears as a whole word, in any case;
//! 3. the configured table is referenced;
//! 4. the database planner accepts the statement (`EXPLAIN`, nothing runs).

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::db::{DbError, SqlDatabase};

/// Reported keyword and its whole-word pattern.
static DENYLIST: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        "DROP",
        "DELETE",
        "INSERT",
        "UPDATE",
        "ALTER",
        "CREATE",
        "TRUNCATE",
        "GRANT",
        "REVOKE",
        "EXEC",
        "EXECUTE",
        "DECLARE",
        "INTO OUTFILE",
        "INTO DUMPFILE",
    ]
    .into_iter()
    .map(|keyword| {
        let words: Vec<String> = keyword.split(' ').map(regex::escape).collect();
        let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
        (keyword, Regex::new(&pattern).expect("valid denylist pattern"))
    })
    .collect()
});

/// SQL text that passed every check. Only the validator can create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    sql: String,
}

impl ValidatedQuery {
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

/// Outcome of the full gate: an executable query, or the first failing reason.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(ValidatedQuery),
    Invalid(String),
}

pub struct SqlValidator {
    table_name: String,
    table_pattern: Regex,
}

impl SqlValidator {
    pub fn new(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        let table_pattern = Regex::new(&format!(r#"(?i)(^|[^\w"]){}($|[^\w"])|"{}""#,
            regex::escape(&table_name),
            regex::escape(&table_name)
        ))
        .expect("escaped table name is a valid pattern");

        Self {
            table_name,
            table_pattern,
        }
    }

    /// Runs the three text-only checks; `Some(reason)` on the first failure.
    pub fn check_static(&self, sql: &str) -> Option<String> {
        let trimmed = sql.trim();

        if !trimmed.to_uppercase().starts_with("SELECT") {
            return Some("Only SELECT queries are allowed".to_string());
        }

        if let Some((keyword, _)) = DENYLIST.iter().find(|(_, pattern)| pattern.is_match(trimmed)) {
            return Some(format!("Query contains forbidden keyword: {}", keyword));
        }

        if !self.table_pattern.is_match(trimmed) {
            return Some(format!("Query must reference the {} table", self.table_name));
        }

        None
    }

    /// Full gate, including the planner dry run. Database faults other than a
    /// planner rejection are returned as errors rather than verdicts.
    pub async fn validate(&self, sql: &str, db: &dyn SqlDatabase) -> Result<ValidationResult, DbError> {
        if let Some(reason) = self.check_static(sql) {
            info!("SQL rejected: {}", reason);
            return Ok(ValidationResult::Invalid(reason));
        }

        match db.explain(sql).await {
            Ok(()) => {
                debug!("SQL approved: {}", sql);
                Ok(ValidationResult::Valid(ValidatedQuery {
                    sql: sql.trim().to_string(),
                }))
            }
            Err(DbError::Query(e)) => {
                let message = e.to_string();
                info!("SQL rejected by planner: {}", message);
                if message.trim().is_empty() {
                    Ok(ValidationResult::Invalid("SQL syntax error".to_string()))
                } else {
                    Ok(ValidationResult::Invalid(message))
                }
            }
            Err(e) => Err(e),
        }
    }
}
