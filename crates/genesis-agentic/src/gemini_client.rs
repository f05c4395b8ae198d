//! Gemini Client
//!
//! LLM client for the Google Generative Language API. Models are tried in
//! preference order; a model the key cannot reach (404/403) falls through to
//! the next one and the first model that answers is remembered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::llm_client::{non_empty, GenerationOptions, LlmClient};
use super::transport::{key_from_env, Endpoint, Reply};

/// Preference order when `GEMINI_MODEL` is not set
pub const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    endpoint: Endpoint,
    models: Vec<String>,
    /// Index into `models` of the model that last answered
    active: Arc<AtomicUsize>,
    options: GenerationOptions,
}

impl GeminiClient {
    /// Pinned to `GEMINI_MODEL` when set, otherwise the full fallback chain
    pub fn new(api_key: String) -> Self {
        match std::env::var("GEMINI_MODEL") {
            Ok(model) if !model.trim().is_empty() => Self::with_model(api_key, model.trim()),
            _ => Self::with_models(
                api_key,
                FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            ),
        }
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self::with_models(api_key, vec![model.to_string()])
    }

    /// Create with an explicit fallback chain
    pub fn with_models(api_key: String, models: Vec<String>) -> Self {
        Self {
            endpoint: Endpoint::new("Gemini", "x-goog-api-key", api_key, &[]),
            models,
            active: Arc::new(AtomicUsize::new(0)),
            options: GenerationOptions::from_env(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(key_from_env("GEMINI_API_KEY")?))
    }

    async fn call_model(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CallOutcome> {
        let url = format!("{}/{}:generateContent", API_BASE, model);
        let body = serde_json::json!({
            "systemInstruction": {"parts": [{"text": system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": user_prompt}]}],
            "generationConfig": {
                "temperature": self.options.temperature,
                "maxOutputTokens": self.options.max_tokens
            }
        });

        let reply: ApiResponse = match self.endpoint.post(&url, &body).await? {
            Reply::Refused(status, text)
                if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN =>
            {
                return Ok(CallOutcome::ModelUnavailable(format!("{}: {}", status, text)));
            }
            other => other.accepted(self.endpoint.provider())?,
        };

        let text = reply.candidates.into_iter().next().map(|c| {
            c.content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        });
        Ok(CallOutcome::Text(non_empty(self.endpoint.provider(), text)?))
    }
}

enum CallOutcome {
    Text(String),
    ModelUnavailable(String),
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let start = self.active.load(Ordering::Relaxed);
        let mut last_unavailable = None;
        for idx in start..self.models.len() {
            let model = &self.models[idx];
            match self.call_model(model, system_prompt, user_prompt).await? {
                CallOutcome::Text(text) => {
                    if idx != start {
                        tracing::info!(model = %model, "Gemini fell back to model");
                        self.active.store(idx, Ordering::Relaxed);
                    }
                    return Ok(text);
                }
                CallOutcome::ModelUnavailable(reason) => {
                    tracing::debug!(model = %model, %reason, "Gemini model unavailable");
                    last_unavailable = Some(reason);
                }
            }
        }
        Err(anyhow!(
            "No compatible Gemini model found ({})",
            last_unavailable.unwrap_or_else(|| "no models configured".to_string())
        ))
    }

    fn model_name(&self) -> &str {
        let idx = self.active.load(Ordering::Relaxed);
        self.models.get(idx).map(String::as_str).unwrap_or("gemini")
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_model() {
        let client = GeminiClient::with_model("test-key".to_string(), "gemini-1.5-pro");
        assert_eq!(client.model_name(), "gemini-1.5-pro");
        assert_eq!(client.provider_name(), "Gemini");
    }

    #[test]
    fn test_fallback_chain_starts_at_preferred() {
        let models = FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
        let client = GeminiClient::with_models("k".into(), models);
        assert_eq!(client.model_name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_response_parsing_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.clone())
            .collect();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_empty_candidates_tolerated() {
        let parsed: ApiResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
