use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::SchemaColumn;
use crate::llm::models::CompletionRequest;
use crate::llm::{LlmError, LlmManager};
use crate::pipeline::models::{GeneratedArtifact, GenerationRequest};
use crate::pipeline::normalize::{normalize_sql, strip_code_fences};
use crate::pipeline::prompt::PromptBuilder;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model output is not a valid artifact: {0}")]
    Decode(String),
    #[error("model returned no SQL")]
    Empty,
}

/// Decoding settings for the two flows.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub chart_max_tokens: usize,
    pub sql_max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            chart_max_tokens: 500,
            sql_max_tokens: 200,
        }
    }
}

/// Strictly decodes chart-flow model output into an artifact.
///
/// Only surrounding whitespace and an enclosing code fence are tolerated.
pub fn decode_artifact(raw: &str) -> Result<GeneratedArtifact, GenerationError> {
    let body = strip_code_fences(raw.trim());
    let artifact: GeneratedArtifact =
        serde_json::from_str(body.trim()).map_err(|e| GenerationError::Decode(e.to_string()))?;

    if artifact.sql_query.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(artifact)
}

pub struct GenerationClient {
    llm: Arc<LlmManager>,
    prompts: PromptBuilder,
    settings: GenerationSettings,
}

impl GenerationClient {
    pub fn new(llm: Arc<LlmManager>, prompts: PromptBuilder, settings: GenerationSettings) -> Self {
        Self {
            llm,
            prompts,
            settings,
        }
    }

    /// Chart flow: SQL plus chart configuration. A requested chart type always
    /// replaces whatever the model chose.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, GenerationError> {
        let prompt = self.prompts.chart_prompt(request);
        debug!("Chart prompt:\n{}", prompt.system);

        let completion = CompletionRequest::new(prompt.system, prompt.user)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.chart_max_tokens)
            .json();
        let raw = self.llm.complete(&completion).await?;
        debug!("Raw chart completion: {}", raw);

        let mut artifact = decode_artifact(&raw)?;

        if let Some(requested) = request.requested_chart_type {
            if artifact.chart_config.chart_type != requested {
                info!(
                    "Overriding model chart type {} with requested {}",
                    artifact.chart_config.chart_type, requested
                );
            }
            artifact.chart_config.chart_type = requested;
        }

        Ok(artifact)
    }

    /// SQL-only flow: a single cleaned statement.
    pub async fn generate_sql(&self, natural_language_query: &str, schema: &[SchemaColumn]) -> Result<String, GenerationError> {
        let prompt = self.prompts.sql_prompt(natural_language_query, schema);
        debug!("SQL prompt:\n{}", prompt.system);

        let completion = CompletionRequest::new(prompt.system, prompt.user)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.sql_max_tokens);
        let raw = self.llm.complete(&completion).await?;
        debug!("Raw SQL completion: {}", raw);

        let sql = normalize_sql(&raw);
        if sql.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(sql)
    }
}
