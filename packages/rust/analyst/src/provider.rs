//! Text-completion providers.
//!
//! [`CompletionProvider`] is the seam between the analyst and a model API.
//! [`AnthropicClient`] talks to the Anthropic Messages API; [`ScriptedProvider`]
//! returns canned responses for tests and offline runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use compete_shared::{AnthropicConfig, CompeteError, Result};

use crate::prompts::{Prompt, PromptKind};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A single-turn text completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` output tokens.
    ///
    /// Only `prompt.text` is model input; `prompt.kind` is metadata.
    async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String>;

    /// Model identifier, for logs and the connectivity check.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for `POST {base_url}/v1/messages`.
pub struct AnthropicClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompeteError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model, kind = prompt.kind.name(), max_tokens = max_tokens))]
    async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: &prompt.text,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompeteError::Upstream(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(CompeteError::Upstream(format!(
                "Anthropic API returned {status}: {message}"
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CompeteError::Upstream(format!("invalid Anthropic response: {e}")))?;

        let text = body
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| CompeteError::Upstream("no text content in response".into()))?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// A canned reply: text, or an upstream failure message.
type Reply = std::result::Result<String, String>;

/// Provider that answers from a script instead of a model.
///
/// Replies registered with [`on_text`](Self::on_text) match any prompt
/// whose text contains the needle and take precedence over per-kind replies
/// from [`on`](Self::on). Every prompt received is recorded.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    text_rules: Vec<(String, Reply)>,
    kind_rules: Vec<(PromptKind, Reply)>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to every prompt of `kind`.
    pub fn on(mut self, kind: PromptKind, response: impl Into<String>) -> Self {
        self.kind_rules.push((kind, Ok(response.into())));
        self
    }

    /// Reply with `response` to any prompt containing `needle`.
    pub fn on_text(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.text_rules.push((needle.into(), Ok(response.into())));
        self
    }

    /// Fail any prompt containing `needle` with an upstream error.
    pub fn fail_on_text(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.text_rules.push((needle.into(), Err(message.into())));
        self
    }

    /// All prompts received so far, in arrival order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn reply_for(&self, prompt: &Prompt) -> Option<&Reply> {
        self.text_rules
            .iter()
            .find(|(needle, _)| prompt.text.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .or_else(|| {
                self.kind_rules
                    .iter()
                    .find(|(kind, _)| *kind == prompt.kind)
                    .map(|(_, reply)| reply)
            })
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &Prompt, _max_tokens: u32) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }

        match self.reply_for(prompt) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(CompeteError::Upstream(message.clone())),
            None => Err(CompeteError::Upstream("no scripted reply for prompt".into())),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
