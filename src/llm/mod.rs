pub mod models;
pub mod providers;
pub mod retry;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use self::models::CompletionRequest;
use self::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM API responded with status code {status}: {body}")]
    StatusError { status: u16, body: String },
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::ConnectionError(_) | LlmError::Timeout(_) => true,
            LlmError::StatusError { status, .. } => *status == 429 || *status >= 500,
            LlmError::ResponseError(_) | LlmError::ConfigError(_) => false,
        }
    }
}

/// The remote text-generation service: system instruction plus user message in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Owns the configured backend and applies the timeout and retry policy to every call.
pub struct LlmManager {
    generator: Box<dyn TextGenerator>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn TextGenerator> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        info!("Using {} LLM backend with model {}", config.backend, config.model);
        Ok(Self::with_generator(
            generator,
            RetryPolicy::from(&config.retry),
            config.timeout(),
        ))
    }

    pub fn with_generator(generator: Box<dyn TextGenerator>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            generator,
            retry,
            timeout,
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!("Sending completion request ({} system chars)", request.system.len());
        self.retry
            .run(
                || async {
                    match tokio::time::timeout(self.timeout, self.generator.complete(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(LlmError::Timeout(self.timeout)),
                    }
                },
                LlmError::is_transient,
            )
            .await
    }
}
