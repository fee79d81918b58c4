//! Remote completion clients for road-ai
//!
//! This crate provides the provider abstraction the conversation driver
//! talks to, plus HTTP implementations for Gemini and OpenAI-compatible
//! endpoints.

pub mod base;
pub mod gemini;
pub mod openai_compat;

pub use base::{LLMProvider, ProviderError, ProviderResult, ProviderSettings};
pub use gemini::GeminiClient;
pub use openai_compat::OpenAICompatClient;

use road_ai_core::config::{ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Build the provider selected by configuration
pub fn build_provider(
    config: &ProviderConfig,
    system_instruction: impl Into<String>,
) -> ProviderResult<Arc<dyn LLMProvider>> {
    let settings = ProviderSettings::from_config(config);
    let provider: Arc<dyn LLMProvider> = match config.kind {
        ProviderKind::Gemini => Arc::new(GeminiClient::new(settings, system_instruction)?),
        ProviderKind::Openai => Arc::new(OpenAICompatClient::new(settings, system_instruction)?),
    };
    Ok(provider)
}
