//! LLM Client Trait
//!
//! Unified interface for LLM providers (Gemini, Anthropic, OpenAI).

use anyhow::Result;
use async_trait::async_trait;

/// Sampling parameters shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

impl GenerationOptions {
    /// Read `LLM_TEMPERATURE` / `LLM_MAX_TOKENS`, keeping defaults for unset or bad values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
        }
    }
}

/// Unified LLM client interface
///
/// A completion that comes back empty is reported as an error by every
/// implementation, so callers only ever see usable text on `Ok`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the LLM with system + user prompts, return raw text response
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}

/// Reject blank completions with a provider-tagged error
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(t) if !t.trim().is_empty() => {
            tracing::debug!(provider, chars = t.len(), "completion received");
            Ok(t)
        }
        _ => Err(anyhow::anyhow!("Empty response from {}", provider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_rejects_blank() {
        assert!(non_empty("Test", None).is_err());
        assert!(non_empty("Test", Some("  \n".into())).is_err());
        assert_eq!(non_empty("Test", Some("ok".into())).unwrap(), "ok");
    }

    #[test]
    fn test_default_options() {
        let options = GenerationOptions::default();
        assert_eq!(options.max_tokens, 4096);
        assert!((options.temperature - 0.1).abs() < f32::EPSILON);
    }
}
