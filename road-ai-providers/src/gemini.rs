//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use road_ai_core::session::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{ensure_success, LLMProvider, ProviderError, ProviderResult, ProviderSettings};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    settings: ProviderSettings,
    system_instruction: String,
}

impl GeminiClient {
    /// Create a new Gemini client conditioned on `system_instruction`
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

    fn build_request(&self, history: &[Message], text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|msg| Content {
                role: Some(wire_role(msg.role)),
                parts: vec![Part {
                    text: msg.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part {
                text: text.to_string(),
            }],
        });

        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        }
    }

    /// Concatenate the text parts of the first candidate
    fn parse_response(response: GenerateContentResponse) -> ProviderResult<String> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ProviderError::InvalidResponse(format!(
                "No candidates in response ({})",
                reason
            )));
        };

        if let Some(reason) = &candidate.finish_reason {
            debug!("Gemini finish reason: {}", reason);
        }

        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn send_message(&self, history: &[Message], text: &str) -> ProviderResult<String> {
        let request = self.build_request(history, text);
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base, self.settings.model
        );

        debug!(
            "Sending generateContent request to {} with {} prior turns",
            url,
            history.len()
        );

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.settings.api_key {
            req_builder = req_builder.header("x-goog-api-key", api_key);
        }
        let req_builder = self.settings.apply_extra_headers(req_builder);

        let response = ensure_success(req_builder.send().await?).await?;
        let body = response.text().await?;
        let response_data: GenerateContentResponse = serde_json::from_str(&body)?;
        Self::parse_response(response_data)
    }

    fn get_default_model(&self) -> String {
        self.settings.model.clone()
    }
}
