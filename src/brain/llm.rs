// Hosted language-model client (Google Gemini `generateContent`).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Failure of the external model call. Never surfaced past the brain.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model payload: {0}")]
    Malformed(String),
    #[error("model returned no text")]
    Empty,
}

impl LlmError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Timeout => "timeout",
            LlmError::Transport(_) => "transport",
            LlmError::Status { .. } => "status",
            LlmError::Malformed(_) => "malformed",
            LlmError::Empty => "empty",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// Something that turns a prompt into free text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_candidate_text(body: &Value) -> Result<String, LlmError> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| LlmError::Malformed("missing candidates/content/parts".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(LlmError::Empty);
    }
    Ok(text)
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        if status >= 400 {
            return Err(LlmError::Status {
                status,
                body: text.chars().take(500).collect(),
            });
        }

        let json: Value =
            serde_json::from_str(&text).map_err(|e| LlmError::Malformed(e.to_string()))?;
        extract_candidate_text(&json)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_candidate_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "ACTION: ATTACK\n"}, {"text": "REASON: go"}]
                }
            }]
        });
        assert_eq!(
            extract_candidate_text(&body).unwrap(),
            "ACTION: ATTACK\nREASON: go"
        );
    }

    #[test]
    fn test_extract_candidate_text_errors() {
        let err = extract_candidate_text(&json!({"error": "nope"})).unwrap_err();
        assert_eq!(err.kind(), "malformed");

        let body = json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]});
        assert_eq!(extract_candidate_text(&body).unwrap_err().kind(), "empty");
    }

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            model: DEFAULT_MODEL.into(),
            base_url: format!("{DEFAULT_BASE_URL}/"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_status_error_display() {
        let err = LlmError::Status {
            status: 429,
            body: "quota".into(),
        };
        assert_eq!(err.to_string(), "model returned HTTP 429: quota");
    }
}
