use clap::Parser;
use r2d2::Pool;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod ingest;
mod llm;
mod pipeline;
mod util;
mod web;

#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, CliArgs};
use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::DuckDbDatabase;
use crate::llm::LlmManager;
use crate::pipeline::generate::{GenerationClient, GenerationSettings};
use crate::pipeline::prompt::PromptBuilder;
use crate::pipeline::QueryPipeline;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration; logging depends on it
    let config = AppConfig::new(&args)?;
    init_tracing(&config.logging);

    // Optional one-shot load of the query table
    if let Some(csv_path) = &config.database.seed_csv {
        info!("Seeding table {} from {}", config.database.table_name, csv_path);
        if let Err(e) = ingest::seed_table_from_csv(
            &config.database.connection_string,
            &config.database.table_name,
            Path::new(csv_path),
        ) {
            error!("Failed to seed database: {}", e);
            return Err(e.into());
        }
    }

    info!("Initializing DuckDB connection pool for {}", config.database.connection_string);
    let db_manager = DuckDBConnectionManager::new(config.database.connection_string.clone())
        .read_only(config.database.read_only);
    let pool = Pool::builder()
        .max_size(config.database.pool_size)
        .connection_timeout(config.database.query_timeout())
        .build(db_manager)?;
    let database = Arc::new(DuckDbDatabase::new(pool, config.database.query_timeout()));

    // Initialize LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = Arc::new(LlmManager::new(&config.llm)?);

    let generation = GenerationClient::new(
        llm_manager,
        PromptBuilder::new(config.database.table_name.clone()),
        GenerationSettings {
            temperature: config.llm.temperature,
            chart_max_tokens: config.llm.chart_max_tokens,
            sql_max_tokens: config.llm.sql_max_tokens,
        },
    );
    let pipeline = QueryPipeline::new(database, generation, config.database.table_name.clone());

    // Fail fast when the target table is missing
    match pipeline.schema().await {
        Ok(columns) => info!("Table {} has {} columns", config.database.table_name, columns.len()),
        Err(e) => {
            error!("Failed to read schema for {}: {}", config.database.table_name, e);
            return Err(e.into());
        }
    }

    let app_state = Arc::new(AppState::new(config.clone(), pipeline));

    // Start the web server
    info!("Starting NL-Chart server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
