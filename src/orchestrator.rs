//! Session orchestrator
//!
//! One [`SimulationSession`] drives turns for one client:
//!
//! ```text
//! request -> PromptBuilder -> LLM -> CodeExtractor -> CodeGate -> Executor -> TurnReport
//! ```
//!
//! Code supplied with the request bypasses generation and goes to the gate
//! as written.
//!
//! Every failure inside a turn is folded into the [`TurnReport`]; `run_turn`
//! itself cannot fail and the session stays usable afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use genesis_agentic::LlmClient;
use genesis_templates::TemplateRegistry;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{RuntimeConfig, SessionConfig};
use crate::error::{RuntimeError, TurnError};
use crate::execution::{
    CodeGate, EngineHandle, ExecutionOutcome, Executor, GateDecision, GatePolicy, RuntimeInfo,
    SimulationRuntime, StageEvidence,
};
use crate::execution::outcome::serialize_secs;
use crate::extractor::{CodeExtractor, ExtractionMethod};
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::session::{ConversationHistory, SessionState, Stage, TurnOutcome};

#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub description: String,
    /// Client-supplied code; bypasses generation but not the gate
    pub code: Option<String>,
}

impl TurnRequest {
    pub fn describe(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code: None,
        }
    }

    pub fn with_code(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code: Some(code.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    Llm,
    Fallback,
    Client,
}

/// Code produced for a request, before gating
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCode {
    pub code: String,
    pub source: CodeSource,
    pub extraction: ExtractionMethod,
    /// Why the fallback was used, if it was
    pub degraded: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub success: bool,
    pub skipped: bool,
    pub disposition: &'static str,
    pub code: String,
    pub source: CodeSource,
    pub logs: Vec<String>,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    #[serde(serialize_with = "serialize_secs")]
    pub execution_time: Duration,
    pub entities_created: usize,
    pub evidence: StageEvidence,
    pub completed_stages: Vec<Stage>,
    pub next_stage: Stage,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmInfo {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_stages: Vec<Stage>,
    pub current_stage: Stage,
    pub next_stage: Stage,
    pub error_count: u32,
    pub entities: BTreeMap<String, String>,
    pub turns: u64,
    pub summary: String,
    pub gate_policy: GatePolicy,
    pub runtime: RuntimeInfo,
    pub llm: Option<LlmInfo>,
}

pub struct SimulationSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    history: ConversationHistory,
    executor: Executor,
    gate: CodeGate,
    prompt_builder: PromptBuilder,
    extractor: CodeExtractor,
    llm: Option<Arc<dyn LlmClient>>,
    module: String,
    alias: String,
}

impl SimulationSession {
    /// Open a session on a fresh runtime from the shared engine handle
    pub async fn open(
        engine: &EngineHandle,
        session: &SessionConfig,
        templates: Arc<TemplateRegistry>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Result<Self, RuntimeError> {
        let runtime = engine.open_runtime().await?;
        Ok(Self::with_runtime(runtime, engine.config(), session, templates, llm))
    }

    pub fn with_runtime(
        runtime: Box<dyn SimulationRuntime>,
        runtime_config: &RuntimeConfig,
        session: &SessionConfig,
        templates: Arc<TemplateRegistry>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let alias = runtime_config.alias.clone();
        let id = Uuid::new_v4();
        tracing::info!(session = %id, policy = %session.gate_policy, "simulation session opened");
        Self {
            id,
            started_at: Utc::now(),
            state: SessionState::new(),
            history: ConversationHistory::new(session.history_turns),
            executor: Executor::new(runtime, &alias, runtime_config.capture_output),
            gate: CodeGate::new(session.gate_policy, &alias),
            prompt_builder: PromptBuilder::new(
                templates,
                session.template_top_k,
                session.template_excerpt_chars,
            )
            .with_alias(&alias),
            extractor: CodeExtractor,
            llm,
            module: runtime_config.module.clone(),
            alias,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Prompt the next generation would see
    pub fn prompt_for(&self, description: &str) -> String {
        self.prompt_builder
            .build(description, &self.state, &self.history)
    }

    /// Ask the model for a continuation; falls back to stage-aware canned code
    pub async fn generate_code(&self, description: &str) -> GeneratedCode {
        let degraded = match &self.llm {
            None => TurnError::LlmUnavailable("no LLM backend configured".to_string()),
            Some(llm) => {
                let prompt = self.prompt_for(description);
                match llm.chat(SYSTEM_PROMPT, &prompt).await {
                    Ok(text) => {
                        let extraction = self.extractor.extract_detailed(&text);
                        if extraction.found() {
                            return GeneratedCode {
                                code: extraction.code,
                                source: CodeSource::Llm,
                                extraction: extraction.method,
                                degraded: None,
                            };
                        }
                        TurnError::Extraction
                    }
                    Err(e) => TurnError::LlmUnavailable(e.to_string()),
                }
            }
        };

        tracing::warn!(kind = degraded.kind(), error = %degraded, "using fallback code");
        GeneratedCode {
            code: fallback_code(&self.state, &self.module, &self.alias),
            source: CodeSource::Fallback,
            extraction: ExtractionMethod::None,
            degraded: Some(degraded.to_string()),
        }
    }

    pub async fn run_turn(&mut self, request: TurnRequest) -> TurnReport {
        let description = request.description.trim().to_string();
        let mut notes = Vec::new();

        let client_code = request.code.filter(|c| !c.trim().is_empty());
        let (code, source) = match client_code {
            Some(raw) => (self.extractor.client_code(&raw), CodeSource::Client),
            None => {
                let generated = self.generate_code(&description).await;
                if let Some(reason) = generated.degraded {
                    notes.push(format!("fallback code used: {}", reason));
                }
                (generated.code, generated.source)
            }
        };

        let decision = self.gate.evaluate(&code, &self.state);
        tracing::info!(
            session = %self.id,
            disposition = decision.name(),
            source = ?source,
            "fragment gated"
        );

        let (outcome, code, error_kind) = match decision {
            GateDecision::Skip { stages } => {
                let reason = TurnError::DuplicateStage { stages };
                notes.push(format!("skipped: {}", reason));
                (ExecutionOutcome::skipped(vec![format!("Skipped: {}", reason)]), code, None)
            }
            GateDecision::Reject { stage, blocked_by } => {
                let err = TurnError::OrderViolation { stage, blocked_by };
                let mut outcome = ExecutionOutcome::rejected(err.to_string());
                outcome.logs.push(format!("Rejected: {}", err));
                self.history
                    .add_turn(&description, &code, TurnOutcome::from(&outcome));
                (outcome, code, Some(err.kind()))
            }
            GateDecision::Execute { code } => {
                let outcome = self.execute(&description, &code).await;
                let kind = execution_error_kind(&outcome);
                (outcome, code, kind)
            }
            GateDecision::Rewrite { code, removed } => {
                let reason = TurnError::DuplicateStage { stages: removed };
                notes.push(format!("rewritten: removed statements, {}", reason));
                let outcome = self.execute(&description, &code).await;
                let kind = execution_error_kind(&outcome);
                (outcome, code, kind)
            }
        };

        TurnReport {
            success: outcome.success,
            skipped: outcome.skipped,
            disposition: disposition(&outcome, error_kind),
            code,
            source,
            logs: outcome.logs,
            error: outcome.error,
            error_kind,
            execution_time: outcome.execution_time,
            entities_created: outcome.entities_created,
            evidence: outcome.evidence,
            completed_stages: self.state.completed().iter().copied().collect(),
            next_stage: self.state.next_required_stage(),
            notes,
        }
    }

    async fn execute(&mut self, description: &str, code: &str) -> ExecutionOutcome {
        self.executor
            .run(description, code, &mut self.state, &mut self.history)
            .await
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            started_at: self.started_at,
            completed_stages: self.state.completed().iter().copied().collect(),
            current_stage: self.state.current_stage(),
            next_stage: self.state.next_required_stage(),
            error_count: self.state.error_count(),
            entities: self.state.entities().clone(),
            turns: self.history.total_turns(),
            summary: self.state.summary(),
            gate_policy: self.gate.policy(),
            runtime: self.executor.runtime_info(),
            llm: self.llm.as_ref().map(|llm| LlmInfo {
                provider: llm.provider_name().to_string(),
                model: llm.model_name().to_string(),
            }),
        }
    }

    /// Restart the engine and forget everything the session knew
    pub async fn reset(&mut self) -> Result<(), RuntimeError> {
        self.executor.reset().await?;
        self.state.reset();
        self.history.clear();
        tracing::info!(session = %self.id, "session reset");
        Ok(())
    }
}

fn execution_error_kind(outcome: &ExecutionOutcome) -> Option<&'static str> {
    if outcome.success {
        return None;
    }
    let err = TurnError::Execution {
        message: outcome.error.clone().unwrap_or_default(),
        traceback: outcome.traceback.clone(),
    };
    Some(err.kind())
}

fn disposition(outcome: &ExecutionOutcome, error_kind: Option<&'static str>) -> &'static str {
    match (outcome.skipped, outcome.success, error_kind) {
        (true, _, _) => "skipped",
        (_, true, _) => "executed",
        (_, false, Some("order_violation")) => "rejected",
        _ => "failed",
    }
}

/// Always-valid program containing only the stages still legal for `state`
pub fn fallback_code(state: &SessionState, module: &str, alias: &str) -> String {
    let mut lines = vec![format!("import {} as {}", module, alias)];
    if !state.is_completed(Stage::Initialized) {
        lines.push(format!("{}.init(backend={}.cpu)", alias, alias));
    }
    let built = state.is_completed(Stage::Built);
    if !built && !state.is_completed(Stage::SceneCreated) {
        lines.push(format!("scene = {}.Scene(show_viewer=False)", alias));
    }
    if !built {
        if !state.is_completed(Stage::EntitiesAdded) {
            lines.push(format!("plane = scene.add_entity({}.morphs.Plane())", alias));
            lines.push(format!(
                "sphere = scene.add_entity({}.morphs.Sphere(radius=0.2, pos=(0, 0, 1)))",
                alias
            ));
        }
        lines.push("scene.build()".to_string());
    }
    lines.push("for i in range(100):".to_string());
    lines.push("    scene.step()".to_string());
    lines.join("\n")
}
