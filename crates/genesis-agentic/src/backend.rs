//! Provider selection from `AGENT_BACKEND`

use std::fmt;
use std::str::FromStr;

use anyhow::Result;

/// Which hosted model answers generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    #[default]
    Gemini,
    Anthropic,
    OpenAi,
}

/// Accepted spellings, lowercase
const ALIASES: &[(&str, AgentBackend)] = &[
    ("gemini", AgentBackend::Gemini),
    ("google", AgentBackend::Gemini),
    ("anthropic", AgentBackend::Anthropic),
    ("claude", AgentBackend::Anthropic),
    ("openai", AgentBackend::OpenAi),
    ("gpt", AgentBackend::OpenAi),
];

impl AgentBackend {
    /// Unset means Gemini; an unrecognised value is an error rather than a silent default
    pub fn from_env() -> Result<Self> {
        match std::env::var("AGENT_BACKEND") {
            Ok(value) if !value.trim().is_empty() => Ok(value.parse()?),
            _ => Ok(Self::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::Gemini => "Gemini",
            AgentBackend::Anthropic => "Anthropic",
            AgentBackend::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::Gemini => "GEMINI_API_KEY",
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
            AgentBackend::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown AGENT_BACKEND '{value}'. Valid values: {}", valid_values())]
pub struct ParseBackendError {
    value: String,
}

fn valid_values() -> String {
    ALIASES
        .iter()
        .map(|(alias, _)| *alias)
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for AgentBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, backend)| *backend)
            .ok_or(ParseBackendError { value: wanted })
    }
}

impl fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias_parses_case_insensitively() {
        for (alias, backend) in ALIASES {
            assert_eq!(alias.to_uppercase().parse::<AgentBackend>().unwrap(), *backend);
        }
        assert_eq!(" GPT ".parse::<AgentBackend>().unwrap(), AgentBackend::OpenAi);
    }

    #[test]
    fn test_unknown_backend_lists_choices() {
        let err = "llama".parse::<AgentBackend>().unwrap_err().to_string();
        assert!(err.contains("'llama'"));
        assert!(err.contains("gemini, google, anthropic"));
    }

    #[test]
    fn test_display_matches_provider_name() {
        assert_eq!(AgentBackend::default().to_string(), "Gemini");
        assert_eq!(AgentBackend::OpenAi.to_string(), "OpenAI");
    }
}
