//! Process-wide engine handle
//!
//! Created once at startup and shared by reference. Sessions ask it for a
//! runtime; nothing else knows whether the engine was initialized.

use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use super::python::PythonRuntime;
use super::runtime::SimulationRuntime;
use super::scripted::ScriptedRuntime;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

const FIND_SPEC: &str =
    "import importlib.util, sys; sys.exit(0 if importlib.util.find_spec(sys.argv[1]) else 1)";

#[derive(Debug, Clone, Serialize)]
pub struct EngineProbe {
    pub available: bool,
    pub runtime: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct EngineHandle {
    config: RuntimeConfig,
}

impl EngineHandle {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Independent runtime for one session
    pub async fn open_runtime(&self) -> Result<Box<dyn SimulationRuntime>, RuntimeError> {
        if self.config.dry_run {
            tracing::info!("using scripted engine (dry run)");
            return Ok(Box::new(ScriptedRuntime::new(&self.config)));
        }
        let runtime = PythonRuntime::start(self.config.clone()).await?;
        Ok(Box::new(runtime))
    }

    /// Check the engine module is importable without starting a session
    pub async fn probe(&self) -> EngineProbe {
        if self.config.dry_run {
            return EngineProbe {
                available: true,
                runtime: "scripted",
                detail: "dry run: scripted engine in use".to_string(),
            };
        }

        let parts = shlex::split(&self.config.python)
            .filter(|parts| !parts.is_empty())
            .unwrap_or_else(|| vec![self.config.python.clone()]);
        let status = Command::new(&parts[0])
            .args(parts.iter().skip(1))
            .arg("-c")
            .arg(FIND_SPEC)
            .arg(&self.config.module)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => EngineProbe {
                available: true,
                runtime: "python",
                detail: format!("module '{}' importable via {}", self.config.module, self.config.python),
            },
            Ok(_) => EngineProbe {
                available: false,
                runtime: "python",
                detail: format!("module '{}' not found for {}", self.config.module, self.config.python),
            },
            Err(e) => EngineProbe {
                available: false,
                runtime: "python",
                detail: format!("failed to run {}: {}", self.config.python, e),
            },
        }
    }
}
