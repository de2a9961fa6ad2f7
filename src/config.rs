use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: u32,
    /// Table every generated query must target
    pub table_name: String,
    pub read_only: bool,
    pub query_timeout_secs: u64,
    /// CSV file loaded into `table_name` before the pool is opened
    pub seed_csv: Option<String>,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "nl-chart.duckdb".to_string(),
            pool_size: 5,
            table_name: "sales_data".to_string(),
            read_only: true,
            query_timeout_secs: 30,
            seed_csv: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is not set
    pub api_key_env: String,
    pub api_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub chart_max_tokens: usize,
    pub sql_max_tokens: usize,
    pub retry: RetryConfig,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "remote".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            api_url: None,
            timeout_secs: 60,
            temperature: 0.1,
            chart_max_tokens: 500,
            sql_max_tokens: 200,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String, // "text" or "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file
    #[arg(long)]
    pub database: Option<String>,

    /// CSV file to load into the target table at startup
    #[arg(long, value_name = "FILE")]
    pub seed_csv: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder();

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/nl-chart/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // NLCHART__LLM__MODEL=... style overrides
        config_builder = config_builder.add_source(
            Environment::with_prefix("NLCHART")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;
        config.apply_args(args);
        config.check()?;
        Ok(config)
    }

    /// Rejects values that deserialize fine but cannot run.
    fn check(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::Message("database.pool_size must be at least 1".to_string()));
        }
        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "database.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Message("llm.timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.web.host = host.clone();
        }
        if let Some(port) = args.port {
            self.web.port = port;
        }
        if let Some(database) = &args.database {
            self.database.connection_string = database.clone();
        }
        if let Some(seed_csv) = &args.seed_csv {
            self.database.seed_csv = Some(seed_csv.clone());
        }
    }
}
