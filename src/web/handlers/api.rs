use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::SchemaColumn;
use crate::pipeline::models::ChartType;
use crate::pipeline::{ChartResponse, PipelineError, SqlResponse};
use crate::web::state::AppState;

const SAMPLE_ROWS: usize = 5;

// Request types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub chart_type: Option<ChartType>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(rename = "generatedSQL", skip_serializing_if = "Option::is_none")]
    pub generated_sql: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            generated_sql: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub table_name: String,
    pub llm_backend: String,
    pub llm_model: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Which endpoint failed; decides the client-facing wording.
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    GenerateChart,
    NlToSql,
    SampleSales,
    QuerySales,
}

impl Endpoint {
    fn failure_message(self) -> &'static str {
        match self {
            Endpoint::GenerateChart => "Failed to generate chart",
            Endpoint::NlToSql => "Failed to convert natural language to SQL",
            Endpoint::SampleSales => "Failed to fetch sales",
            Endpoint::QuerySales => "Failed to execute query",
        }
    }
}

// Generation, schema and execution faults are logged here and reported generically.
fn api_error(endpoint: Endpoint, err: PipelineError) -> ApiError {
    match err {
        PipelineError::MissingQuery => (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Query is required"))),
        PipelineError::Validation { reason, sql } => {
            let body = match endpoint {
                Endpoint::QuerySales => ErrorBody::new(reason),
                Endpoint::NlToSql => ErrorBody {
                    error: "Generated SQL query is invalid".to_string(),
                    details: Some(reason),
                    generated_sql: Some(sql),
                },
                Endpoint::GenerateChart | Endpoint::SampleSales => ErrorBody {
                    details: Some(reason),
                    ..ErrorBody::new("Generated SQL query is invalid")
                },
            };
            (StatusCode::BAD_REQUEST, Json(body))
        }
        other => {
            error!("{}: {}", endpoint.failure_message(), other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(endpoint.failure_message())),
            )
        }
    }
}

// Malformed bodies and unknown chart types get the same error shape as pipeline failures.
fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        info!("Rejected request body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                details: Some(rejection.body_text()),
                ..ErrorBody::new("Invalid request body")
            }),
        )
    })
}

// API Implementations

pub async fn generate_chart(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChartRequest>, JsonRejection>,
) -> Result<Json<ChartResponse>, ApiError> {
    let payload = read_body(payload)?;
    let query = payload.query.unwrap_or_default();
    let response = state
        .pipeline
        .generate_chart(&query, payload.chart_type)
        .await
        .map_err(|e| api_error(Endpoint::GenerateChart, e))?;

    info!(
        "Chart generated: {} with {} rows",
        response.chart_config.chart_type,
        response.data.len()
    );
    Ok(Json(response))
}

pub async fn nl_to_sql(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SqlResponse>, ApiError> {
    let payload = read_body(payload)?;
    let query = payload.query.unwrap_or_default();
    state
        .pipeline
        .nl_to_sql(&query)
        .await
        .map(Json)
        .map_err(|e| api_error(Endpoint::NlToSql, e))
}

pub async fn sample_sales(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let result = state
        .pipeline
        .sample_rows(SAMPLE_ROWS)
        .await
        .map_err(|e| api_error(Endpoint::SampleSales, e))?;
    Ok(Json(result.rows))
}

pub async fn query_sales(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let payload = read_body(payload)?;
    let query = payload.query.unwrap_or_default();
    info!("Executing SQL query: {}", query);

    let result = state
        .pipeline
        .run_sql(&query)
        .await
        .map_err(|e| api_error(Endpoint::QuerySales, e))?;
    Ok(Json(result.rows))
}

pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SchemaColumn>>, ApiError> {
    state.pipeline.schema().await.map(Json).map_err(|e| {
        error!("Failed to read schema: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Failed to read schema")),
        )
    })
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table_name: state.config.database.table_name.clone(),
        llm_backend: state.config.llm.backend.clone(),
        llm_model: state.config.llm.model.clone(),
    })
}
