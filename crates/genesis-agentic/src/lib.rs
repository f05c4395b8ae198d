//! LLM clients for Genesis code generation
//!
//! This crate turns a prompt into a completion. It knows nothing about the
//! simulation engine or the session state machine; those stay in `genesis-mcp`.
//!
//! ## Backend Selection
//!
//! Set `AGENT_BACKEND` environment variable:
//! - `gemini` (default): Google Gemini API
//! - `anthropic`: Anthropic Claude API
//! - `openai`: OpenAI API

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod gemini_client;
pub mod llm_client;
pub mod openai_client;
mod transport;

pub use backend::AgentBackend;
pub use client_factory::{create_llm_client, create_llm_client_with_key, current_backend};
pub use llm_client::{GenerationOptions, LlmClient};
