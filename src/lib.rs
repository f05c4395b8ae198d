//! Genesis MCP - continuing simulation sessions driven by an LLM
//!
//! A client describes what it wants simulated; the server generates Genesis
//! code, gates it against what the live session has already done, runs it,
//! and feeds the outcome back into the next prompt.
//!
//! ```text
//! request -> PromptBuilder -> LLM -> CodeExtractor -> CodeGate -> Executor
//!                 ^                                                  |
//!                 └──── SessionState + ConversationHistory <─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use genesis_mcp::{EngineHandle, ServerConfig, SimulationSession, TurnRequest};
//! use genesis_templates::TemplateRegistry;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = ServerConfig::dry_run();
//! let engine = EngineHandle::new(config.runtime.clone());
//! let templates = Arc::new(TemplateRegistry::builtin()?);
//! let mut session = SimulationSession::open(&engine, &config.session, templates, None).await?;
//!
//! let report = session
//!     .run_turn(TurnRequest::with_code("init", "import genesis as gs\ngs.init()"))
//!     .await;
//! assert!(report.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod extractor;
pub mod mcp;
pub mod orchestrator;
pub mod prompt;
pub mod session;

// HTTP transport (when enabled)
#[cfg(feature = "server")]
pub mod http;

pub use config::{RuntimeConfig, ServerConfig, SessionConfig};
pub use error::{ConfigError, RuntimeError, TurnError};
pub use execution::{
    CodeGate, EngineHandle, ExecutionOutcome, Executor, GateDecision, GatePolicy,
    SimulationRuntime,
};
pub use extractor::CodeExtractor;
pub use orchestrator::{fallback_code, SimulationSession, TurnReport, TurnRequest};
pub use prompt::PromptBuilder;
pub use session::{ConversationHistory, SessionState, Stage};
