//! Base trait for completion providers

use async_trait::async_trait;
use road_ai_core::config::ProviderConfig;
use road_ai_core::session::Message;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for road_ai_core::Error {
    fn from(e: ProviderError) -> Self {
        road_ai_core::Error::Provider(e.to_string())
    }
}

/// Connection and generation settings shared by the HTTP clients
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub extra_headers: HashMap<String, String>,
}

impl ProviderSettings {
    /// Settings for `model` with everything else at its default
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_config(&ProviderConfig {
            model: model.into(),
            ..ProviderConfig::default()
        })
    }

    /// Settings taken from the `provider` config section
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            api_key: Some(config.api_key.clone()).filter(|key| !key.trim().is_empty()),
            api_base: config
                .api_base
                .clone()
                .filter(|base| !base.trim().is_empty()),
            model: config.model.clone(),
            temperature: f64::from(config.temperature),
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.request_timeout_secs),
            extra_headers: config.extra_headers.clone().unwrap_or_default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Endpoint base without a trailing slash
    pub(crate) fn base_or(&self, default: &str) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub(crate) fn http_client(&self) -> ProviderResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(format!("HTTP client: {}", e)))
    }

    pub(crate) fn apply_extra_headers(
        &self,
        mut req_builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }
        req_builder
    }
}

/// Trait for the remote completion service.
///
/// Implementations are stateless between calls: `history` always carries
/// every prior turn, oldest first, and `text` is the current user turn.
/// The conditioning document is fixed when the provider is built.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Ask the model for a reply to `text` given the prior turns
    async fn send_message(&self, history: &[Message], text: &str) -> ProviderResult<String>;

    /// Get the model this provider talks to
    fn get_default_model(&self) -> String;
}

/// Turn a non-2xx response into an `ApiError`
pub(crate) async fn ensure_success(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::ApiError(format!(
        "HTTP {}: {}",
        status, error_text
    )))
}
