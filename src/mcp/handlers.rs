//! MCP Tool Handlers
//!
//! Each tool is a thin adapter over [`SimulationSession`]. Turns are
//! serialised through the session mutex; one turn runs at a time.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use genesis_templates::TemplateRegistry;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::execution::EngineHandle;
use crate::orchestrator::{SimulationSession, TurnRequest};

use super::protocol::ToolCallResult;

pub struct ToolHandlers {
    session: Arc<Mutex<SimulationSession>>,
    engine: Arc<EngineHandle>,
    templates: Arc<TemplateRegistry>,
}

impl ToolHandlers {
    pub fn new(
        session: SimulationSession,
        engine: Arc<EngineHandle>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            engine,
            templates,
        }
    }

    /// Handle a tool call by name
    pub async fn handle(&self, name: &str, args: Value) -> ToolCallResult {
        match self.dispatch(name, args).await {
            Ok(v) => ToolCallResult::json(&v),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                ToolCallResult::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<Value> {
        match name {
            "run_simulation" => self.run_simulation(args).await,
            "generate_simulation" => self.generate_simulation(args).await,
            "get_templates" => self.get_templates(args),
            "session_status" => self.session_status().await,
            "reset_session" => self.reset_session().await,
            "check_environment" => self.check_environment().await,
            _ => Err(anyhow!("Unknown tool: {}", name)),
        }
    }

    /// Generate (or accept) a fragment and run it against the live session
    async fn run_simulation(&self, args: Value) -> Result<Value> {
        let description = args["description"]
            .as_str()
            .ok_or_else(|| anyhow!("description required"))?;
        let request = match args["code"].as_str() {
            Some(code) => TurnRequest::with_code(description, code),
            None => TurnRequest::describe(description),
        };

        let report = self.session.lock().await.run_turn(request).await;

        let mut out = serde_json::to_value(&report)?;
        if report.success {
            let result = if report.skipped {
                "Fragment skipped: it repeats stages that already ran"
            } else {
                "Simulation code executed"
            };
            out["result"] = json!(result);
        }
        Ok(out)
    }

    async fn generate_simulation(&self, args: Value) -> Result<Value> {
        let description = args["description"]
            .as_str()
            .ok_or_else(|| anyhow!("description required"))?;

        let session = self.session.lock().await;
        let generated = session.generate_code(description).await;
        Ok(json!({
            "code": generated.code,
            "source": generated.source,
            "extraction": generated.extraction,
            "degraded": generated.degraded,
            "next_stage": session.state().next_required_stage(),
        }))
    }

    fn get_templates(&self, args: Value) -> Result<Value> {
        match args["category"].as_str() {
            Some(category) => {
                let templates = self.templates.category(category);
                if templates.is_empty() {
                    return Err(anyhow!(
                        "Unknown category: {} (available: {})",
                        category,
                        self.templates.categories().join(", ")
                    ));
                }
                Ok(json!({
                    "category": category,
                    "templates": templates.iter().map(|t| json!({
                        "name": t.name,
                        "description": t.description,
                    })).collect::<Vec<_>>()
                }))
            }
            None => Ok(json!({
                "count": self.templates.len(),
                "categories": self.templates.index(),
            })),
        }
    }

    async fn session_status(&self) -> Result<Value> {
        let status = self.session.lock().await.status();
        Ok(serde_json::to_value(status)?)
    }

    async fn reset_session(&self) -> Result<Value> {
        let mut session = self.session.lock().await;
        session
            .reset()
            .await
            .map_err(|e| anyhow!("Reset failed: {}", e))?;
        Ok(json!({
            "success": true,
            "message": "Session reset: engine restarted, state and history cleared",
            "session_id": session.id(),
        }))
    }

    async fn check_environment(&self) -> Result<Value> {
        let probe = self.engine.probe().await;
        let llm = self.session.lock().await.status().llm;
        let llm_available = llm.is_some();
        Ok(json!({
            "engine": probe,
            "runtime": self.engine.config(),
            "llm": llm,
            "llm_available": llm_available,
            "templates": self.templates.len(),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
