use crate::config::LlmConfig;
use crate::llm::models::{ChatMessage, CompletionRequest};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/chat";

/// Local Ollama server using the `/api/chat` endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct OllamaMessage {
    content: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            model: config.model.clone(),
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: ChatMessage::from_request(request),
            stream: false, // one JSON body, not a token stream
            format: request.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

fn parse_response(body: &str) -> Result<String, LlmError> {
    let response = serde_json::from_str::<OllamaResponse>(body).map_err(|e| {
        error!("Failed to parse Ollama response: {} - Response was: {}", e, body);
        LlmError::ResponseError(format!("Failed to parse Ollama response: {}", e))
    })?;

    if response.done == Some(false) {
        return Err(LlmError::ResponseError(
            "Ollama returned a partial response".to_string(),
        ));
    }

    Ok(response.message.content)
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("Ollama API responded with status code: {} - {}", status, response_text);
            return Err(LlmError::StatusError {
                status: status.as_u16(),
                body: response_text,
            });
        }

        debug!("Raw response from Ollama: {}", response_text);
        parse_response(&response_text)
    }
}
