//! Chat-completion HTTP client.
//!
//! Talks to any OpenAI-compatible endpoint at `{base}/v1/chat/completions`,
//! non-streaming. One request per coaching session; failures surface as
//! typed errors and are never retried here.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{CoachError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author (`system`, `user`, `assistant`).
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Build a `system` role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a `user` role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat completion request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model ID to use for completion.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum number of tokens to generate.
    pub max_tokens: usize,
}

/// Chat completion response. Carries only the fields the engine reads;
/// anything else the provider sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// List of completion choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token usage statistics, when the provider reports them.
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A single completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: ResponseMessage,
    /// Reason the model stopped generating (`stop`, `length`, etc.).
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The message body of a completion choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    /// Reply text. Providers send `null` here for tool-only turns.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics for a completion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible chat-completion provider.
#[derive(Clone)]
pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmClient {
    /// Create a client from provider config and a resolved API key.
    ///
    /// An empty key means requests go out without an `Authorization`
    /// header, which local endpoints accept.
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.api_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: reqwest::Client::new(),
        }
    }

    /// The model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one completion request and return the first choice's text.
    ///
    /// # Errors
    ///
    /// Returns `Request` for transport failures and 4xx statuses, `Auth`
    /// for 401/403, `Provider` for 5xx or a malformed body, and
    /// `Completion` when the provider returns no choices.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| CoachError::Request(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CoachError::Provider(format!("malformed completion response: {e}")))?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CoachError::Completion("provider returned no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Map an HTTP error status to the matching error variant.
fn map_http_error(status: StatusCode, body: &str) -> CoachError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => CoachError::Auth(format!("provider authentication failed: {message}")),
        400..=499 => CoachError::Request(format!(
            "provider rejected request (HTTP {}): {message}",
            status.as_u16()
        )),
        _ => CoachError::Provider(format!("provider HTTP {}: {message}", status.as_u16())),
    }
}

/// Extract an error message from a provider error response body.
///
/// Prefers the `error.message` field of a JSON body; otherwise falls back
/// to a snippet of the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
