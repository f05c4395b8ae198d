//! OpenAI chat completions
//!
//! Only the first choice is read.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::llm_client::{non_empty, GenerationOptions, LlmClient};
use super::transport::{key_from_env, model_from_env, Endpoint};

const DEFAULT_MODEL: &str = "gpt-4o";
const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiClient {
    endpoint: Endpoint,
    model: String,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl CompletionResponse {
    fn first_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

impl OpenAiClient {
    /// Model comes from `OPENAI_MODEL` when set
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, &model_from_env("OPENAI_MODEL", DEFAULT_MODEL))
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            endpoint: Endpoint::new("OpenAI", "Authorization", format!("Bearer {}", api_key), &[]),
            model: model.to_string(),
            options: GenerationOptions::from_env(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(key_from_env("OPENAI_API_KEY")?))
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = self.request(system_prompt, user_prompt);
        let reply: CompletionResponse = self
            .endpoint
            .post(COMPLETIONS_URL, &body)
            .await?
            .accepted(self.endpoint.provider())?;
        non_empty(self.endpoint.provider(), reply.first_text())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        self.endpoint.provider()
    }
}
