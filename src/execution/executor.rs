//! Fragment executor
//!
//! The only writer of [`SessionState`] and [`ConversationHistory`] for
//! fragments that actually ran. Stage evidence is applied as follows:
//!
//! | fragment | capture on | capture off |
//! |----------|------------|-------------|
//! | succeeded | output banners | source call sites |
//! | failed | output banners | output banners (none) |

use std::collections::BTreeSet;
use std::time::Instant;

use super::environment::ExecutionEnvironment;
use super::outcome::{EvidenceAuthority, ExecutionOutcome, StageEvidence};
use super::runtime::{RuntimeInfo, SimulationRuntime};
use crate::error::RuntimeError;
use crate::session::{
    ConversationHistory, OutputStageDetector, SessionState, SourceStageDetector, Stage,
    StageDetector, TurnOutcome,
};

pub struct Executor {
    runtime: Box<dyn SimulationRuntime>,
    environment: ExecutionEnvironment,
    source_detector: SourceStageDetector,
    output_detector: OutputStageDetector,
    capture: bool,
}

impl Executor {
    pub fn new(runtime: Box<dyn SimulationRuntime>, alias: &str, capture: bool) -> Self {
        Self {
            runtime,
            environment: ExecutionEnvironment::new(alias),
            source_detector: SourceStageDetector::new(alias),
            output_detector: OutputStageDetector,
            capture,
        }
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    pub fn runtime_info(&self) -> RuntimeInfo {
        self.runtime.describe()
    }

    /// Run an accepted fragment and record the turn
    pub async fn run(
        &mut self,
        request: &str,
        code: &str,
        state: &mut SessionState,
        history: &mut ConversationHistory,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let source = self.source_detector.detect(code);

        let mut outcome = match self.runtime.execute(code, self.capture).await {
            Ok(raw) => {
                let logs: Vec<String> = raw.stdout.lines().map(str::to_string).collect();
                let output = self.output_detector.detect_lines(&logs);

                let (authority, evidence): (EvidenceAuthority, &BTreeSet<Stage>) =
                    if raw.ok && !self.capture {
                        (EvidenceAuthority::Source, &source)
                    } else {
                        (EvidenceAuthority::Output, &output)
                    };
                if raw.ok && self.capture && output != source {
                    tracing::debug!(?source, ?output, "source and output detection disagree");
                }
                let applied = state.record_stages(evidence);

                let fresh = self.environment.absorb(&raw.bindings);
                let entities_created = fresh.len();
                state.record_entities(fresh);

                let mut outcome = ExecutionOutcome {
                    success: raw.ok,
                    logs,
                    entities_created,
                    evidence: StageEvidence {
                        source: source.clone(),
                        output,
                        applied,
                        authority,
                    },
                    ..Default::default()
                };

                if !raw.ok {
                    state.record_error();
                    let kind = raw.error_type.unwrap_or_else(|| "Exception".to_string());
                    let message = raw.error.unwrap_or_else(|| kind.clone());
                    outcome.logs.push(format!("{}: {}", kind, message));
                    if let Some(tb) = &raw.traceback {
                        outcome.logs.extend(tb.lines().map(str::to_string));
                    }
                    outcome.error = Some(message);
                    outcome.error_type = Some(kind);
                    outcome.traceback = raw.traceback;
                }
                outcome
            }
            Err(e) => self.runtime_failure(e, source, state),
        };

        outcome.execution_time = started.elapsed();
        history.add_turn(request, code, TurnOutcome::from(&outcome));

        tracing::info!(
            turn = history.total_turns(),
            success = outcome.success,
            applied = ?outcome.evidence.applied,
            entities = outcome.entities_created,
            elapsed_ms = outcome.execution_time.as_millis() as u64,
            "fragment executed"
        );
        outcome
    }

    fn runtime_failure(
        &mut self,
        error: RuntimeError,
        source: BTreeSet<Stage>,
        state: &mut SessionState,
    ) -> ExecutionOutcome {
        tracing::error!(error = %error, "engine runtime failure");
        if matches!(error, RuntimeError::WorkerExited | RuntimeError::Io(_)) {
            // the interpreter is gone and its namespace with it
            state.reset();
            self.environment.clear();
        }
        state.record_error();
        let message = error.to_string();
        ExecutionOutcome {
            success: false,
            logs: vec![format!("RuntimeError: {}", message)],
            error: Some(message),
            error_type: Some("RuntimeError".to_string()),
            evidence: StageEvidence {
                source,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Fresh engine and empty namespace; the caller clears state and history
    pub async fn reset(&mut self) -> Result<(), RuntimeError> {
        self.runtime.reset().await?;
        self.environment.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::execution::scripted::ScriptedRuntime;

    fn executor(capture: bool) -> Executor {
        let runtime = ScriptedRuntime::new(&RuntimeConfig::default());
        Executor::new(Box::new(runtime), "gs", capture)
    }

    #[tokio::test]
    async fn test_success_applies_output_stages() {
        let mut exec = executor(true);
        let mut state = SessionState::new();
        let mut history = ConversationHistory::default();
        let outcome = exec
            .run("init", "gs.init()\nscene = gs.Scene()\nplane = scene.add_entity(gs.morphs.Plane())", &mut state, &mut history)
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.evidence.authority, EvidenceAuthority::Output);
        assert_eq!(
            state.completed().iter().copied().collect::<Vec<_>>(),
            vec![Stage::Initialized, Stage::SceneCreated, Stage::EntitiesAdded]
        );
        assert_eq!(outcome.entities_created, 1);
        assert!(state.entities().contains_key("plane"));
        assert_eq!(history.total_turns(), 1);
    }

    #[tokio::test]
    async fn test_capture_off_uses_source() {
        let mut exec = executor(false);
        let mut state = SessionState::new();
        let mut history = ConversationHistory::default();
        let outcome = exec.run("init", "gs.init()", &mut state, &mut history).await;
        assert!(outcome.logs.is_empty());
        assert_eq!(outcome.evidence.authority, EvidenceAuthority::Source);
        assert!(state.is_completed(Stage::Initialized));
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_progress() {
        let mut exec = executor(true);
        let mut state = SessionState::new();
        let mut history = ConversationHistory::default();
        let outcome = exec
            .run("x", "gs.init()\nraise ValueError(\"boom\")", &mut state, &mut history)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
        assert!(outcome.logs.iter().any(|l| l == "ValueError: boom"));
        assert!(outcome.logs.iter().any(|l| l.starts_with("Traceback")));
        assert!(state.is_completed(Stage::Initialized));
        assert_eq!(state.error_count(), 1);
        let turn = history.last_turn().unwrap();
        assert!(!turn.executed_successfully);
        assert_eq!(turn.error.as_deref(), Some("boom"));
    }
}
