use serde::Serialize;

/// A single chat turn sent to the text-generation service.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Instruction context ("system" role)
    pub system: String,
    /// The end user's question, forwarded verbatim
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Ask the backend to constrain output to a JSON object
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.1,
            max_tokens: 500,
            json_mode: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Chat message in the wire format shared by the OpenAI-compatible and Ollama chat APIs.
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn from_request(request: &CompletionRequest) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system",
                content: request.system.clone(),
            },
            ChatMessage {
                role: "user",
                content: request.user.clone(),
            },
        ]
    }
}
