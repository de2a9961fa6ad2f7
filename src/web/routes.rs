use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes - chart generation, NL to SQL and table access
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Generation endpoints
            .route("/generate-chart", post(handlers::api::generate_chart))
            .route("/nl-to-sql", post(handlers::api::nl_to_sql))

            // Direct table access
            .route(
                "/sales",
                get(handlers::api::sample_sales).post(handlers::api::query_sales),
            )
            .route("/schema", get(handlers::api::get_schema))

            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
