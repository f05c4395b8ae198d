//! Shared HTTP plumbing for the provider clients
//!
//! Every provider is a POST of a JSON body with a credential header. The only
//! thing that differs between them is the shape of the body and how the reply
//! is turned into text, so that lives with each client.

use anyhow::{anyhow, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Credential header plus the client it is sent with
#[derive(Clone)]
pub(crate) struct Endpoint {
    provider: &'static str,
    http: reqwest::Client,
    auth: (&'static str, String),
    extra: &'static [(&'static str, &'static str)],
}

/// Result of one POST that reached the server
pub(crate) enum Reply<T> {
    Parsed(T),
    /// Non-2xx status with the body text, for callers that treat some codes specially
    Refused(StatusCode, String),
}

impl<T> Reply<T> {
    /// Turn any refusal into a provider-tagged error
    pub(crate) fn accepted(self, provider: &str) -> Result<T> {
        match self {
            Reply::Parsed(value) => Ok(value),
            Reply::Refused(status, body) => Err(anyhow!("{} API error {}: {}", provider, status, body)),
        }
    }
}

impl Endpoint {
    pub(crate) fn new(
        provider: &'static str,
        auth_header: &'static str,
        auth_value: String,
        extra: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            provider,
            http: reqwest::Client::new(),
            auth: (auth_header, auth_value),
            extra,
        }
    }

    pub(crate) fn provider(&self) -> &'static str {
        self.provider
    }

    pub(crate) async fn post<B, T>(&self, url: &str, body: &B) -> Result<Reply<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(url)
            .header(self.auth.0, &self.auth.1)
            .json(body);
        for (name, value) in self.extra {
            request = request.header(*name, *value);
        }

        tracing::debug!(provider = self.provider, url, "sending completion request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Ok(Reply::Refused(status, text));
        }
        Ok(Reply::Parsed(response.json().await?))
    }
}

/// Model named by `var`, or `default` when unset or blank
pub(crate) fn model_from_env(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// API key from `var`, rejecting unset and blank values
pub(crate) fn key_from_env(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("{} environment variable not set", var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_reply_names_provider_and_status() {
        let reply: Reply<()> = Reply::Refused(StatusCode::UNAUTHORIZED, "bad key".into());
        let err = reply.accepted("OpenAI").unwrap_err().to_string();
        assert!(err.starts_with("OpenAI API error 401"));
        assert!(err.ends_with("bad key"));
    }

    #[test]
    fn test_model_from_env_falls_back_on_unset() {
        assert_eq!(
            model_from_env("GENESIS_AGENTIC_TEST_UNSET_MODEL", "fallback"),
            "fallback"
        );
        assert!(key_from_env("GENESIS_AGENTIC_TEST_UNSET_KEY").is_err());
    }
}
