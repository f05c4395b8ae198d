//! Client Factory
//!
//! Builds the configured [`LlmClient`] behind a trait object.

use std::sync::Arc;

use anyhow::Result;

use super::anthropic_client::AnthropicClient;
use super::backend::AgentBackend;
use super::gemini_client::GeminiClient;
use super::llm_client::LlmClient;
use super::openai_client::OpenAiClient;
use super::transport::key_from_env;

/// Backend selected by `AGENT_BACKEND`
pub fn current_backend() -> Result<AgentBackend> {
    AgentBackend::from_env()
}

/// Create a client for the backend named in `AGENT_BACKEND`, reading its API key from env
pub fn create_llm_client() -> Result<Arc<dyn LlmClient>> {
    let backend = current_backend()?;
    let api_key = key_from_env(backend.api_key_var())?;
    create_llm_client_with_key(backend, api_key)
}

/// Create a client for an explicit backend and key
pub fn create_llm_client_with_key(
    backend: AgentBackend,
    api_key: String,
) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match backend {
        AgentBackend::Gemini => Arc::new(GeminiClient::new(api_key)),
        AgentBackend::Anthropic => Arc::new(AnthropicClient::new(api_key)),
        AgentBackend::OpenAi => Arc::new(OpenAiClient::new(api_key)),
    };
    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "LLM client created"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_key_each_backend() {
        for backend in [
            AgentBackend::Gemini,
            AgentBackend::Anthropic,
            AgentBackend::OpenAi,
        ] {
            let client = create_llm_client_with_key(backend, "k".into()).unwrap();
            assert_eq!(client.provider_name(), backend.name());
        }
    }
}
