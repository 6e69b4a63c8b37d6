//! Provider clients: anything that turns a message list into one completion string.
//!
//! The orchestrator only sees [`ProviderClient`]; envelope differences between providers stay
//! inside each variant.

pub mod guard;
pub mod ollama;
pub mod openrouter;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Value, json};
use thiserror::Error;

use crate::agent::memory::Message;

pub use guard::{BUSY_MESSAGE, GuardedClient};
pub use ollama::OllamaClient;
pub use openrouter::OpenRouterClient;

/// Normalized provider output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    /// Provider-specific envelope, kept for diagnostics.
    pub raw: Value,
}

impl ProviderResponse {
    pub fn new(content: impl Into<String>, raw: Value) -> Self {
        Self {
            content: content.into(),
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCategory {
    /// Could not connect / send / read.
    Transport,
    Timeout,
    /// Non-2xx status.
    Status,
    /// 2xx, but the body was not the expected envelope.
    Envelope,
}

impl std::fmt::Display for ProviderErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorCategory::Transport => write!(f, "transport"),
            ProviderErrorCategory::Timeout => write!(f, "timeout"),
            ProviderErrorCategory::Status => write!(f, "status"),
            ProviderErrorCategory::Envelope => write!(f, "envelope"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{category}: {details}")]
pub struct ProviderError {
    pub category: ProviderErrorCategory,
    pub details: String,
}

impl ProviderError {
    pub fn new(category: ProviderErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            details: details.into(),
        }
    }

    pub fn envelope(details: impl Into<String>) -> Self {
        Self::new(ProviderErrorCategory::Envelope, details)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let category = if err.is_timeout() {
            ProviderErrorCategory::Timeout
        } else if err.is_status() {
            ProviderErrorCategory::Status
        } else if err.is_decode() {
            ProviderErrorCategory::Envelope
        } else {
            ProviderErrorCategory::Transport
        };
        Self::new(category, err.to_string())
    }
}

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + 'a>>;

/// A chat-completion backend.
pub trait ProviderClient: Send + Sync {
    fn get_chat_completion<'a>(&'a self, messages: &'a [Message]) -> ProviderFuture<'a>;
}

/// JSON schema for `{code, message}`; sent so providers constrain their output.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": {"type": "string"},
            "message": {"type": "string"}
        },
        "required": ["code", "message"],
        "additionalProperties": false
    })
}

/// OpenAI-style `response_format` wrapper around [`response_schema`].
pub fn json_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "action",
            "strict": true,
            "schema": response_schema()
        }
    })
}

pub(crate) fn build_http_client(
    timeout: std::time::Duration,
) -> Result<reqwest::Client, crate::agent::config::ConfigurationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| crate::agent::config::ConfigurationError::HttpClient(e.to_string()))
}

/// Sends a prepared POST and decodes a JSON body, mapping every failure to [`ProviderError`].
pub(crate) async fn send_json(req: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::new(
            ProviderErrorCategory::Status,
            format!("status {status}: {body}"),
        ));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::envelope(format!("response is not JSON ({e}): {body}")))
}
