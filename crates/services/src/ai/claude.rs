use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Claude API key not configured")]
    MissingKey,
    #[error("Claude API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Claude API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("No text in Claude response")]
    EmptyResponse,
}

/// Thin client for the Anthropic Messages API, shared by the analysis
/// adapters.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

impl ClaudeClient {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends one system + user prompt pair and returns the response text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_ref().ok_or(AiError::MissingKey)?;

        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        let claude_resp: ClaudeResponse = response.json().await?;

        claude_resp
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

/// Models occasionally wrap JSON in markdown fences despite instructions.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
