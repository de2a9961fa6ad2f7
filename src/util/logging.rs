use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing/logging from `RUST_LOG` and the configured output format.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false);

    match config.format.as_str() {
        "json" => subscriber.json().with_current_span(false).init(),
        _ => subscriber.init(),
    }
}
