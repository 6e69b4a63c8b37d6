//! Locally-hosted variant: Ollama `POST /api/chat`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ProviderClient, ProviderError, ProviderFuture, ProviderResponse, build_http_client,
    response_schema, send_json,
};
use crate::agent::config::{
    ActorConfig, ConfigurationError, OLLAMA_API_URL_ENV, ProviderSelection, resolve_ollama_url,
};
use crate::agent::memory::Message;

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    format: Value,
    stream: bool,
    /// -1 keeps the model loaded between calls.
    keep_alive: i64,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Pulls `message.content` out of an Ollama chat envelope.
pub fn extract_content(raw: &Value) -> Result<String, ProviderError> {
    if raw.get("message").is_none() {
        return Err(ProviderError::envelope(format!(
            "no message in ollama response: {raw}"
        )));
    }
    let resp: OllamaChatResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::envelope(format!("unexpected envelope ({e}): {raw}")))?;
    Ok(resp.message.content)
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    /// Full endpoint URL, e.g. `http://127.0.0.1:11434/api/chat`.
    url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(
        model: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: url.into(),
            model: model.into(),
        })
    }

    pub fn from_config(cfg: &ActorConfig) -> Result<Self, ConfigurationError> {
        let configured = match &cfg.provider {
            ProviderSelection::Ollama { url } => url.as_deref(),
            other => {
                return Err(ConfigurationError::Invalid(format!(
                    "provider {} is not ollama",
                    other.name()
                )));
            }
        };
        let url = resolve_ollama_url(std::env::var(OLLAMA_API_URL_ENV).ok(), configured)?;
        Self::new(cfg.model.clone(), url, cfg.request_timeout())
    }

    fn request_body<'a>(&'a self, messages: &'a [Message]) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.model,
            messages,
            format: response_schema(),
            stream: false,
            keep_alive: -1,
        }
    }
}

impl ProviderClient for OllamaClient {
    fn get_chat_completion<'a>(&'a self, messages: &'a [Message]) -> ProviderFuture<'a> {
        Box::pin(async move {
            let req = self.client.post(&self.url).json(&self.request_body(messages));
            let raw = send_json(req).await?;
            let content = extract_content(&raw)?;
            Ok(ProviderResponse::new(content, raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::ProviderErrorCategory;
    use crate::llm::test_server::serve_once;

    #[test]
    fn body_disables_streaming_and_pins_model() {
        let c = OllamaClient::new(
            "llama3.2",
            "http://localhost:11434/api/chat",
            Duration::from_secs(1),
        )
        .unwrap();
        let msgs = [Message::user("u")];
        let body = serde_json::to_value(c.request_body(&msgs)).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["keep_alive"], -1);
        assert_eq!(body["format"], response_schema());
        assert_eq!(body["model"], "llama3.2");
    }

    #[test]
    fn extracts_message_content() {
        let raw = json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "{\"code\":\"\",\"message\":\"ok\"}"},
            "done": true
        });
        assert_eq!(
            extract_content(&raw).unwrap(),
            "{\"code\":\"\",\"message\":\"ok\"}"
        );
    }

    #[test]
    fn missing_message_is_an_envelope_error() {
        let err = extract_content(&json!({"error": "model not found"})).unwrap_err();
        assert_eq!(err.category, ProviderErrorCategory::Envelope);
        assert!(err.details.contains("model not found"));
    }

    #[tokio::test]
    async fn chat_round_trip_sends_schema_and_reads_message() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"code\":\"\",\"message\":\"hi\"}"},"done":true}"#,
            Duration::ZERO,
        )
        .await;
        let c = OllamaClient::new("llama3.2", format!("{base}/api/chat"), Duration::from_secs(5))
            .unwrap();

        let resp = c
            .get_chat_completion(&[Message::system("s"), Message::user("u")])
            .await
            .unwrap();
        assert_eq!(resp.content, r#"{"code":"","message":"hi"}"#);

        let req = server.await.unwrap();
        assert!(req.head.starts_with("POST /api/chat "));
        assert_eq!(req.body["stream"], false);
        assert_eq!(req.body["keep_alive"], -1);
        assert_eq!(req.body["format"], response_schema());
        assert_eq!(req.body["messages"][0], json!({"role": "system", "content": "s"}));
    }

    #[tokio::test]
    async fn server_error_status_is_reported() {
        let (base, _server) =
            serve_once("500 Internal Server Error", "boom", Duration::ZERO).await;
        let c = OllamaClient::new("llama3.2", format!("{base}/api/chat"), Duration::from_secs(5))
            .unwrap();

        let err = c.get_chat_completion(&[Message::user("u")]).await.unwrap_err();
        assert_eq!(err.category, ProviderErrorCategory::Status);
        assert!(err.details.contains("500"), "{err}");
        assert!(err.details.contains("boom"), "{err}");
    }

    #[tokio::test]
    async fn stalled_server_times_out() {
        let (base, _server) = serve_once("200 OK", "{}", Duration::from_secs(5)).await;
        let c = OllamaClient::new(
            "llama3.2",
            format!("{base}/api/chat"),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = c.get_chat_completion(&[Message::user("u")]).await.unwrap_err();
        assert_eq!(err.category, ProviderErrorCategory::Timeout);
    }
}
