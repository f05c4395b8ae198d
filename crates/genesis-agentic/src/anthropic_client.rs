//! Claude messages API
//!
//! One system prompt and one user turn per request. Replies may carry several
//! text blocks; they are joined in order.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::llm_client::{non_empty, GenerationOptions, LlmClient};
use super::transport::{key_from_env, model_from_env, Endpoint};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: (&str, &str) = ("anthropic-version", "2023-06-01");

#[derive(Clone)]
pub struct AnthropicClient {
    endpoint: Endpoint,
    model: String,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    text: Option<String>,
}

impl MessagesResponse {
    fn joined_text(self) -> String {
        self.content.into_iter().filter_map(|b| b.text).collect()
    }
}

impl AnthropicClient {
    /// Model comes from `ANTHROPIC_MODEL` when set
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, &model_from_env("ANTHROPIC_MODEL", DEFAULT_MODEL))
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            endpoint: Endpoint::new("Anthropic", "x-api-key", api_key, &[API_VERSION]),
            model: model.to_string(),
            options: GenerationOptions::from_env(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(key_from_env("ANTHROPIC_API_KEY")?))
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            system,
            messages: [Turn {
                role: "user",
                content: user,
            }],
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = self.request(system_prompt, user_prompt);
        let reply: MessagesResponse = self
            .endpoint
            .post(MESSAGES_URL, &body)
            .await?
            .accepted(self.endpoint.provider())?;
        non_empty(self.endpoint.provider(), Some(reply.joined_text()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        self.endpoint.provider()
    }
}
