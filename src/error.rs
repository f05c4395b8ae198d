//! Error types
//!
//! Library errors are typed with `thiserror`; binaries and MCP handlers
//! convert them into `anyhow::Error` at the boundary.

use thiserror::Error;

use crate::session::Stage;

/// Failures talking to the simulation engine process
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to spawn python interpreter `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("python worker protocol violation: {0}")]
    Protocol(String),

    #[error("python worker exited unexpectedly")]
    WorkerExited,

    #[error("worker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-turn failure taxonomy.
///
/// None of these escape a turn: the orchestrator folds each one into the
/// turn report and keeps the session alive.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("no code fragment could be extracted from the model output")]
    Extraction,

    #[error("fragment repeats completed one-shot stage(s): {}", stage_list(.stages))]
    DuplicateStage { stages: Vec<Stage> },

    #[error("{stage} is not allowed once {blocked_by} has completed")]
    OrderViolation { stage: Stage, blocked_by: Stage },

    #[error("{message}")]
    Execution {
        message: String,
        traceback: Option<String>,
    },

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),
}

impl TurnError {
    /// Stable identifier for reports
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Extraction => "extraction_failure",
            TurnError::DuplicateStage { .. } => "duplicate_stage",
            TurnError::OrderViolation { .. } => "order_violation",
            TurnError::Execution { .. } => "execution_exception",
            TurnError::LlmUnavailable(_) => "llm_unavailable",
        }
    }
}

fn stage_list(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Invalid configuration value
#[derive(Debug, Error)]
#[error("invalid value for {key}: '{value}' ({reason})")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_error_messages() {
        let dup = TurnError::DuplicateStage {
            stages: vec![Stage::Initialized, Stage::Built],
        };
        assert_eq!(
            dup.to_string(),
            "fragment repeats completed one-shot stage(s): initialized, built"
        );
        assert_eq!(dup.kind(), "duplicate_stage");

        let order = TurnError::OrderViolation {
            stage: Stage::EntitiesAdded,
            blocked_by: Stage::Built,
        };
        assert!(order.to_string().contains("entities_added"));
    }

    #[test]
    fn test_execution_error_is_bare_message() {
        let err = TurnError::Execution {
            message: "boom".into(),
            traceback: None,
        };
        assert_eq!(err.to_string(), "boom");
    }
}
