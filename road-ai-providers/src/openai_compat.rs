//! OpenAI-compatible `/chat/completions` client

use async_trait::async_trait;
use reqwest::Client;
use road_ai_core::session::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{ensure_success, LLMProvider, ProviderError, ProviderResult, ProviderSettings};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat completion request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

/// Chat completion response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat completion protocol
pub struct OpenAICompatClient {
    client: Client,
    api_base: String,
    settings: ProviderSettings,
    system_instruction: String,
}

impl OpenAICompatClient {
    /// Create a new client conditioned on `system_instruction`
    pub fn new(
        settings: ProviderSettings,
        system_instruction: impl Into<String>,
    ) -> ProviderResult<Self> {
        Ok(Self {
            client: settings.http_client()?,
            api_base: settings.base_or(DEFAULT_API_BASE),
            settings,
            system_instruction: system_instruction.into(),
        })
    }

    fn build_request(&self, history: &[Message], text: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: self.system_instruction.clone(),
        });
        for msg in history {
            messages.push(WireMessage {
                role: match msg.role {
                    Role::User => "user",
                    Role::Model => "assistant",
                },
                content: msg.text.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: text.to_string(),
        });

        ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    fn parse_response(response: ChatCompletionResponse) -> ProviderResult<String> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        if let Some(reason) = &choice.finish_reason {
            debug!("Completion finish reason: {}", reason);
        }

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatClient {
    async fn send_message(&self, history: &[Message], text: &str) -> ProviderResult<String> {
        let request = self.build_request(history, text);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(
            "Sending chat request to {} with model {}",
            self.api_base, self.settings.model
        );

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.settings.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let req_builder = self.settings.apply_extra_headers(req_builder);

        let response = ensure_success(req_builder.send().await?).await?;
        let body = response.text().await?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&body)?;
        Self::parse_response(response_data)
    }

    fn get_default_model(&self) -> String {
        self.settings.model.clone()
    }
}
