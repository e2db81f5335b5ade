//! Completion provider client.
//!
//! Wraps the OpenAI chat completions API behind the [`CompletionProvider`]
//! trait: one prompt in, the first choice's text out. No streaming, no
//! multi-turn; generation failures surface to the caller unretried.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::CompletionConfig;

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Capability to generate a single completion for a prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for the given system instruction and user
    /// message, returning the first choice trimmed of surrounding whitespace.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Whether the provider is reachable.
    async fn health(&self) -> bool;
}

/// Chat-completions client for the OpenAI API.
pub struct OpenAiCompletions {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompletions {
    pub fn new(config: &CompletionConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build completion HTTP client")?;

        Ok(Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("completion API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("reading completion response failed")?;
        parse_completion_response(&json)
    }

    async fn health(&self) -> bool {
        let resp = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }
}

/// Extract the first completion choice's message text, trimmed.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("invalid completion response: missing choices[0].message.content"))?;

    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice_trimmed() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  The answer.\n" } },
                { "message": { "role": "assistant", "content": "ignored" } },
            ],
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "The answer.");
    }

    #[test]
    fn missing_choices_is_an_error() {
        let json = serde_json::json!({ "error": { "message": "quota" } });
        assert!(parse_completion_response(&json).is_err());
    }
}
