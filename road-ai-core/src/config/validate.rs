//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.provider.request_timeout_secs == 0 {
        errors.push("provider.request_timeout_secs must be > 0".to_string());
    }
    if let Some(base) = &config.provider.api_base {
        let base = base.trim();
        if !base.is_empty() && !base.starts_with("http://") && !base.starts_with("https://") {
            errors.push("provider.api_base must be an http(s) URL".to_string());
        }
    }

    if config.chat.default_title.trim().is_empty() {
        errors.push("chat.default_title must not be empty".to_string());
    }
    if config.chat.title_max_chars == 0 {
        errors.push("chat.title_max_chars must be > 0".to_string());
    }
    if config.chat.error_message.trim().is_empty() {
        errors.push("chat.error_message must not be empty".to_string());
    }

    let format = config.logging.format.to_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
