//! Shared fixtures: a scripted engine that records what reached it, and
//! stub LLM clients.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use genesis_agentic::LlmClient;
use genesis_mcp::execution::{RawExecution, RuntimeInfo, ScriptedRuntime, SimulationRuntime};
use genesis_mcp::{RuntimeConfig, RuntimeError, SessionConfig, SimulationSession};
use genesis_templates::TemplateRegistry;

/// Fragments that actually reached the engine
#[derive(Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<String>>>);

impl ExecutionLog {
    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn fragments(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct RecordingRuntime {
    inner: ScriptedRuntime,
    log: ExecutionLog,
}

#[async_trait]
impl SimulationRuntime for RecordingRuntime {
    async fn execute(&mut self, code: &str, capture: bool) -> Result<RawExecution, RuntimeError> {
        self.log.0.lock().unwrap().push(code.to_string());
        self.inner.execute(code, capture).await
    }

    async fn reset(&mut self) -> Result<(), RuntimeError> {
        self.inner.reset().await
    }

    fn describe(&self) -> RuntimeInfo {
        self.inner.describe()
    }
}

/// Replies from a queue (repeating the last one) and keeps every prompt
pub struct StubLlm {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn chat(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}

/// Always fails, like a backend with a bad key
pub struct DownLlm;

#[async_trait]
impl LlmClient for DownLlm {
    async fn chat(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(anyhow!("401 Unauthorized"))
    }

    fn model_name(&self) -> &str {
        "down-model"
    }

    fn provider_name(&self) -> &str {
        "down"
    }
}

pub fn runtime_config(capture_output: bool) -> RuntimeConfig {
    RuntimeConfig {
        dry_run: true,
        capture_output,
        ..RuntimeConfig::default()
    }
}

pub fn templates() -> Arc<TemplateRegistry> {
    Arc::new(TemplateRegistry::builtin().unwrap())
}

pub fn session_with(
    runtime_config: &RuntimeConfig,
    session_config: &SessionConfig,
    llm: Option<Arc<dyn LlmClient>>,
) -> (SimulationSession, ExecutionLog) {
    let log = ExecutionLog::default();
    let runtime = RecordingRuntime {
        inner: ScriptedRuntime::new(runtime_config),
        log: log.clone(),
    };
    let session = SimulationSession::with_runtime(
        Box::new(runtime),
        runtime_config,
        session_config,
        templates(),
        llm,
    );
    (session, log)
}

/// Capturing scripted engine, default session settings, no LLM
pub fn session() -> (SimulationSession, ExecutionLog) {
    session_with(&runtime_config(true), &SessionConfig::default(), None)
}

pub const FULL_PROGRAM: &str = "import genesis as gs
gs.init(backend=gs.cpu)
scene = gs.Scene(show_viewer=False)
plane = scene.add_entity(gs.morphs.Plane())
ball = scene.add_entity(gs.morphs.Sphere(radius=0.2, pos=(0, 0, 1)))
scene.build()
for i in range(10):
    scene.step()";
