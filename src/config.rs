//! Server configuration
//!
//! Loaded once at startup from the environment (after `.env` has been read
//! by the binary). Command-line flags override individual fields.

use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;
use crate::execution::GatePolicy;

/// How fragments reach the engine
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfig {
    /// Interpreter command, shell-split (`"uv run python"` works)
    pub python: String,
    /// Engine module imported once per worker
    pub module: String,
    /// Name the module is bound to in the session namespace
    pub alias: String,
    /// Use the scripted offline engine instead of Python
    pub dry_run: bool,
    /// Capture fragment stdout for stage detection
    pub capture_output: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            module: "genesis".into(),
            alias: "gs".into(),
            dry_run: false,
            capture_output: true,
        }
    }
}

/// Per-session tuning
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub history_turns: usize,
    pub template_top_k: usize,
    pub template_excerpt_chars: usize,
    pub gate_policy: GatePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_turns: 3,
            template_top_k: 3,
            template_excerpt_chars: 200,
            gate_policy: GatePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerConfig {
    pub runtime: RuntimeConfig,
    pub session: SessionConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let runtime_defaults = RuntimeConfig::default();
        let session_defaults = SessionConfig::default();

        Ok(Self {
            runtime: RuntimeConfig {
                python: env_string("GENESIS_PYTHON", &runtime_defaults.python),
                module: env_string("GENESIS_MODULE", &runtime_defaults.module),
                alias: env_string("GENESIS_ALIAS", &runtime_defaults.alias),
                dry_run: env_bool("GENESIS_DRY_RUN", runtime_defaults.dry_run),
                capture_output: env_bool("GENESIS_CAPTURE_OUTPUT", runtime_defaults.capture_output),
            },
            session: SessionConfig {
                history_turns: env_parse("GENESIS_HISTORY_TURNS", session_defaults.history_turns)?,
                template_top_k: env_parse("GENESIS_TEMPLATE_TOP_K", session_defaults.template_top_k)?,
                template_excerpt_chars: env_parse(
                    "GENESIS_TEMPLATE_EXCERPT_CHARS",
                    session_defaults.template_excerpt_chars,
                )?,
                gate_policy: env_parse("GENESIS_GATE_POLICY", session_defaults.gate_policy)?,
            },
        })
    }

    /// Offline configuration: scripted engine, defaults everywhere else
    pub fn dry_run() -> Self {
        let mut config = Self::default();
        config.runtime.dry_run = true;
        config
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}
