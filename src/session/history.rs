//! Conversation history and prompt context
//!
//! Keeps the last few turns verbatim and a running copy of every fragment
//! that executed successfully, so the model can see what already ran.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stage::Stage;
use super::state::SessionState;

/// Returned by [`ConversationHistory::context_for_prompt`] before any turn
pub const FRESH_SESSION_CONTEXT: &str = "# First run: generate a complete Genesis program \
(import, gs.init, scene creation, entities, scene.build, simulation loop).";

/// Result of one turn as seen by the history
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub logs: Vec<String>,
}

/// Immutable record of one request/response cycle
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    /// 1-based, sequential across the whole session
    pub number: u64,
    pub user_input: String,
    pub code: String,
    pub executed_successfully: bool,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
    total_turns: u64,
    executed_source: String,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ConversationHistory {
    /// `capacity` is the number of turns kept verbatim (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
            total_turns: 0,
            executed_source: String::new(),
        }
    }

    pub fn add_turn(&mut self, user_input: &str, code: &str, outcome: TurnOutcome) -> &ConversationTurn {
        self.total_turns += 1;
        if outcome.success && !code.trim().is_empty() {
            if !self.executed_source.is_empty() {
                self.executed_source.push('\n');
            }
            self.executed_source.push_str(code.trim_end());
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(ConversationTurn {
            number: self.total_turns,
            user_input: user_input.to_string(),
            code: code.to_string(),
            executed_successfully: outcome.success,
            error: outcome.error,
            logs: outcome.logs,
            timestamp: Utc::now(),
        });
        tracing::debug!(turn = self.total_turns, retained = self.turns.len(), "turn recorded");
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    pub fn total_turns(&self) -> u64 {
        self.total_turns
    }

    pub fn is_empty(&self) -> bool {
        self.total_turns == 0
    }

    /// Concatenated source of every successful turn
    pub fn executed_source(&self) -> &str {
        &self.executed_source
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.total_turns = 0;
        self.executed_source.clear();
    }

    pub fn context_for_prompt(&self, state: &SessionState) -> String {
        if self.is_empty() {
            return FRESH_SESSION_CONTEXT.to_string();
        }

        let mut out = String::new();
        let completed: Vec<Stage> = state.completed().iter().copied().collect();

        if completed.is_empty() {
            out.push_str("# Completed stages: none\n");
        } else {
            out.push_str("# Completed stages:\n");
            for stage in &completed {
                out.push_str(&format!("# - {}\n", stage.description()));
            }
            out.push_str("# Do not repeat any completed stage.\n");
        }

        if let Some(last) = self.last_turn().filter(|t| !t.executed_successfully) {
            out.push_str("\n# The previous turn FAILED.\n");
            out.push_str(&format!("# Request: {}\n", last.user_input));
            out.push_str(&format!(
                "# Error: {}\n",
                last.error.as_deref().unwrap_or("unknown error")
            ));
            out.push_str("# Failing code:\n```python\n");
            out.push_str(last.code.trim_end());
            out.push_str("\n```\n");
        }

        out.push_str(&format!(
            "\n# Next required stage: {}\n",
            state.next_required_stage().description()
        ));

        if completed.is_empty() {
            out.push_str("# Generate complete code starting from import and gs.init().\n");
        } else {
            out.push_str("\n# Continuation rules:\n");
            if state.is_completed(Stage::Initialized) {
                out.push_str("# - gs.init() already ran; do NOT call it again.\n");
            }
            if state.is_completed(Stage::SceneCreated) {
                out.push_str("# - `scene` already exists; reuse it instead of creating a new one.\n");
            }
            if state.is_completed(Stage::Built) {
                out.push_str("# - scene.build() already ran; do NOT call it again and do NOT add entities.\n");
            }
            out.push_str("# - Variables from earlier turns are still defined.\n");
            out.push_str("# - Generate ONLY the new statements that continue the session.\n");
        }

        if !self.executed_source.is_empty() {
            out.push_str("\n# Code already executed in this session:\n```python\n");
            out.push_str(&self.executed_source);
            out.push_str("\n```\n");
        }

        out
    }
}
