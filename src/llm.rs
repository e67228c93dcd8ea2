//! OpenAI chat-completions client.
//!
//! One call per chat turn: system prompt, replayed history, and the final
//! user message go out as a single completion request.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use crate::config::ModelConfig;

/// Substituted when the API returns a completion without usable content.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

/// One message in the completion request, in wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Client for `POST {api_base}/chat/completions`.
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    config: ModelConfig,
}

impl ChatClient {
    /// Build a client from configuration. Fails when `OPENAI_API_KEY` is not
    /// set, so misconfiguration surfaces at startup rather than mid-chat.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            config: config.clone(),
        })
    }

    /// Request one completion for the given message sequence and return the
    /// assistant's reply text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.name,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return Ok(parse_completion(&json));
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "chat completion error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("chat completion error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat completion failed after retries")))
    }
}

/// Extract `choices[0].message.content` from a completion response body.
/// A well-formed response with empty or missing content falls back to a
/// canned apology instead of an error, matching the upstream contract.
fn parse_completion(json: &serde_json::Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_REPLY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reply_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Hi, I'm Fee." } }
            ]
        });
        assert_eq!(parse_completion(&json), "Hi, I'm Fee.");
    }

    #[test]
    fn missing_content_uses_fallback() {
        assert_eq!(parse_completion(&serde_json::json!({})), FALLBACK_REPLY);
        let empty = serde_json::json!({ "choices": [] });
        assert_eq!(parse_completion(&empty), FALLBACK_REPLY);
        let blank = serde_json::json!({
            "choices": [ { "message": { "content": "" } } ]
        });
        assert_eq!(parse_completion(&blank), FALLBACK_REPLY);
    }

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }
}
