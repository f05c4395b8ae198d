//! Simulation runtime abstraction
//!
//! A runtime owns one live namespace: the engine module bound under its
//! alias plus every name earlier fragments assigned. Fragments run against
//! that namespace as both globals and locals.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// What the engine reported for one fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExecution {
    pub ok: bool,
    /// Captured stdout; empty when capture was off
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub traceback: Option<String>,
    /// Public names in the namespace after the fragment, mapped to a type name
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

/// Static description for `check_environment`
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeInfo {
    pub kind: &'static str,
    pub command: String,
    pub module: String,
    pub alias: String,
}

#[async_trait]
pub trait SimulationRuntime: Send + Sync {
    /// Run one fragment; partial effects of a failing fragment persist
    async fn execute(&mut self, code: &str, capture: bool) -> Result<RawExecution, RuntimeError>;

    /// Discard the namespace and start from a fresh engine
    async fn reset(&mut self) -> Result<(), RuntimeError>;

    fn describe(&self) -> RuntimeInfo;
}
