//! Remote-hosted variant: OpenRouter (OpenAI-compatible `/chat/completions`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ProviderClient, ProviderError, ProviderFuture, ProviderResponse, build_http_client,
    json_response_format, send_json,
};
use crate::agent::config::{
    ActorConfig, ConfigurationError, DEFAULT_OPENROUTER_ENDPOINT, OPENROUTER_API_KEY_ENV,
    ProviderSelection, resolve_api_key,
};
use crate::agent::memory::Message;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    require_parameters: bool,
    response_format: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls `choices[0].message.content` out of a chat-completions envelope.
///
/// A `null` content is returned as empty text; the parser reports it.
pub fn extract_content(raw: &Value) -> Result<String, ProviderError> {
    let resp: ChatResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::envelope(format!("unexpected envelope ({e}): {raw}")))?;
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::envelope(format!("no choices in response: {raw}")))?;
    Ok(choice.message.content.unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Builds the client for an actor, resolving the key from the environment first.
    pub fn from_config(cfg: &ActorConfig) -> Result<Self, ConfigurationError> {
        let (configured_key, endpoint) = match &cfg.provider {
            ProviderSelection::OpenRouter { api_key, endpoint } => {
                (api_key.as_deref(), endpoint.clone())
            }
            other => {
                return Err(ConfigurationError::Invalid(format!(
                    "provider {} is not openrouter",
                    other.name()
                )));
            }
        };
        let api_key = resolve_api_key(std::env::var(OPENROUTER_API_KEY_ENV).ok(), configured_key)?;
        Self::new(
            cfg.model.clone(),
            api_key,
            endpoint.unwrap_or_else(|| DEFAULT_OPENROUTER_ENDPOINT.to_string()),
            cfg.request_timeout(),
        )
    }

    fn request_body<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            require_parameters: true,
            response_format: json_response_format(),
        }
    }
}

impl ProviderClient for OpenRouterClient {
    fn get_chat_completion<'a>(&'a self, messages: &'a [Message]) -> ProviderFuture<'a> {
        Box::pin(async move {
            let req = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&self.request_body(messages));
            let raw = send_json(req).await?;
            let content = extract_content(&raw)?;
            Ok(ProviderResponse::new(content, raw))
        })
    }
}
