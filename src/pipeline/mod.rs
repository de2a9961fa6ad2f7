//! Natural-language question in, vetted SQL (and optionally rows plus a chart) out.
//!
//! Stages run strictly in sequence: schema introspection, prompt construction,
//! generation, normalization, validation, execution. The first failing stage
//! ends the request with a [`PipelineError`].

pub mod execute;
pub mod generate;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod validate;

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{DbError, QueryRows, SchemaColumn, SqlDatabase};
use self::generate::{GenerationClient, GenerationError};
use self::models::{ChartConfig, ChartType, GenerationRequest};
use self::validate::{SqlValidator, ValidatedQuery, ValidationResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Query is required")]
    MissingQuery,
    #[error("failed to read table schema: {0}")]
    Schema(#[source] DbError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("SQL query is invalid: {reason}")]
    Validation { reason: String, sql: String },
    #[error("failed to execute query: {0}")]
    Execution(#[source] DbError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub sql_query: String,
    pub chart_config: ChartConfig,
    pub data: Vec<Map<String, Value>>,
    pub natural_language_query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlResponse {
    pub sql_query: String,
    pub natural_language_query: String,
    pub schema: Vec<SchemaColumn>,
}

pub struct QueryPipeline {
    database: Arc<dyn SqlDatabase>,
    generator: GenerationClient,
    validator: SqlValidator,
    table_name: String,
}

impl QueryPipeline {
    pub fn new(database: Arc<dyn SqlDatabase>, generator: GenerationClient, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            database,
            generator,
            validator: SqlValidator::new(table_name.clone()),
            table_name,
        }
    }

    /// Chart flow: generate SQL and a chart config, validate, execute.
    pub async fn generate_chart(&self, query: &str, requested_chart_type: Option<ChartType>) -> Result<ChartResponse, PipelineError> {
        let query = require_query(query)?;
        info!("Generating chart for: {}", query);

        let request = GenerationRequest {
            natural_language_query: query.to_string(),
            schema: self.schema().await?,
            requested_chart_type,
        };

        let artifact = self.generator.generate(&request).await?;
        info!("Generated SQL: {}", artifact.sql_query);

        let validated = self.approve(&artifact.sql_query).await?;
        let result = execute::execute(self.database.as_ref(), &validated)
            .await
            .map_err(PipelineError::Execution)?;

        let mut chart_config = artifact.chart_config;
        bind_chart_keys(&mut chart_config, &result.columns, requested_chart_type.is_some());

        Ok(ChartResponse {
            sql_query: validated.as_str().to_string(),
            chart_config,
            data: result.rows,
            natural_language_query: query.to_string(),
        })
    }

    /// SQL-only flow: generate and validate; nothing is executed.
    pub async fn nl_to_sql(&self, query: &str) -> Result<SqlResponse, PipelineError> {
        let query = require_query(query)?;
        info!("Converting to SQL: {}", query);

        let schema = self.schema().await?;
        let sql = self.generator.generate_sql(query, &schema).await?;
        info!("Generated SQL: {}", sql);

        let validated = self.approve(&sql).await?;

        Ok(SqlResponse {
            sql_query: validated.as_str().to_string(),
            natural_language_query: query.to_string(),
            schema,
        })
    }

    /// Runs caller-supplied SQL through the same gate as generated SQL.
    pub async fn run_sql(&self, sql: &str) -> Result<QueryRows, PipelineError> {
        let sql = require_query(sql)?;
        let validated = self.approve(sql).await?;
        execute::execute(self.database.as_ref(), &validated)
            .await
            .map_err(PipelineError::Execution)
    }

    /// First `limit` rows of the table, for previews.
    pub async fn sample_rows(&self, limit: usize) -> Result<QueryRows, PipelineError> {
        let sql = format!("SELECT * FROM \"{}\" LIMIT {}", self.table_name.replace('"', "\"\""), limit);
        self.run_sql(&sql).await
    }

    pub async fn schema(&self) -> Result<Vec<SchemaColumn>, PipelineError> {
        self.database
            .table_columns(&self.table_name)
            .await
            .map_err(PipelineError::Schema)
    }

    async fn approve(&self, sql: &str) -> Result<ValidatedQuery, PipelineError> {
        let result = self
            .validator
            .validate(sql, self.database.as_ref())
            .await
            .map_err(PipelineError::Execution)?;

        match result {
            ValidationResult::Valid(query) => Ok(query),
            ValidationResult::Invalid(reason) => Err(PipelineError::Validation {
                reason,
                sql: sql.to_string(),
            }),
        }
    }
}

fn require_query(query: &str) -> Result<&str, PipelineError> {
    let query = query.trim();
    if query.is_empty() {
        Err(PipelineError::MissingQuery)
    } else {
        Ok(query)
    }
}

/// Falls back to a table when the chart names columns the result lacks,
/// unless the caller picked the chart type explicitly.
fn bind_chart_keys(config: &mut ChartConfig, columns: &[String], type_requested: bool) {
    let missing: Vec<&str> = config
        .referenced_keys()
        .filter(|key| !columns.iter().any(|c| c == key))
        .collect();

    if missing.is_empty() || config.chart_type == ChartType::Table {
        return;
    }

    if type_requested {
        warn!(
            "Chart keys {:?} are not in the result columns {:?}; keeping requested {}",
            missing, columns, config.chart_type
        );
    } else {
        warn!(
            "Chart keys {:?} are not in the result columns {:?}; falling back to table",
            missing, columns
        );
        config.chart_type = ChartType::Table;
    }
}
