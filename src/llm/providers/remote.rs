use crate::config::LlmConfig;
use crate::llm::models::{ChatMessage, CompletionRequest};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// OpenAI-compatible chat-completions backend (Groq by default).
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct PromptRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct PromptResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api_key = config.resolve_api_key().ok_or_else(|| {
            LlmError::ConfigError(format!(
                "API key is required for remote LLM provider (set llm.api_key or {})",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            model: config.model.clone(),
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> PromptRequest {
        PromptRequest {
            model: self.model.clone(),
            messages: ChatMessage::from_request(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

fn parse_response(body: &str) -> Result<String, LlmError> {
    let response: PromptResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::ResponseError(format!("Failed to parse completion: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::ResponseError("No choices in response".to_string()))
}

#[async_trait]
impl TextGenerator for RemoteLlmProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.build_request(request);
        debug!("Sending request to {} with model {}", self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("LLM API responded with status code: {} - {}", status, text);
            return Err(LlmError::StatusError {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("Raw completion: {}", text);
        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> RemoteLlmProvider {
        RemoteLlmProvider::new(&LlmConfig {
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let result = RemoteLlmProvider::new(&LlmConfig {
            api_key: None,
            api_key_env: "NLCHART_TEST_NO_SUCH_VAR".to_string(),
            ..LlmConfig::default()
        });
        assert!(matches!(result, Err(LlmError::ConfigError(_))));
    }

    #[test]
    fn json_mode_sets_response_format() {
        let request = CompletionRequest::new("rules", "total revenue?")
            .with_max_tokens(500)
            .json();
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "rules"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "total revenue?"}));
    }

    #[test]
    fn plain_mode_omits_response_format() {
        let request = CompletionRequest::new("rules", "q");
        let body = serde_json::to_value(provider().build_request(&request)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn first_choice_content_is_returned() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn empty_choices_are_an_error() {
        assert!(matches!(
            parse_response(r#"{"choices":[]}"#),
            Err(LlmError::ResponseError(_))
        ));
        assert!(matches!(parse_response("<html>"), Err(LlmError::ResponseError(_))));
    }
}
