//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::session::{DEFAULT_TITLE, TITLE_MAX_CHARS};

/// Diagnostic appended to a session when the model cannot be reached
pub const DEFAULT_ERROR_MESSAGE: &str =
    "System Error: Unable to fetch standards from the AI. Check your API configuration.";

/// Root configuration for road-ai
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote model configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Reference document
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which wire protocol the remote model speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini `generateContent`
    #[default]
    Gemini,
    /// OpenAI-compatible `/chat/completions`
    Openai,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Openai => "openai",
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    /// Override of the provider's default endpoint
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Seconds before an unanswered request fails
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            extra_headers: None,
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Title of a session before its first user message
    #[serde(default = "default_title")]
    pub default_title: String,
    /// Characters of the first user message kept in the title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    /// Model message appended when a turn fails
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_title_max_chars() -> usize {
    TITLE_MAX_CHARS
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_title: default_title(),
            title_max_chars: default_title_max_chars(),
            error_message: default_error_message(),
        }
    }
}

/// Reference document configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeConfig {
    /// File replacing the built-in standards summary
    #[serde(default)]
    pub document_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.road-ai/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
