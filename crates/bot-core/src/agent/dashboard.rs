use serde::Serialize;
use tracing::info;

use super::memory::Message;

pub const LOG_CONTENT_LIMIT: usize = 2000;

/// One provider attempt, as shown on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionRecord {
    pub prompt: Vec<Message>,
    pub model: String,
    pub response: Option<String>,
}

impl InteractionRecord {
    pub fn new(prompt: &[Message], model: &str, response: Option<&str>) -> Self {
        Self {
            prompt: truncate_prompt(prompt, LOG_CONTENT_LIMIT),
            model: model.to_string(),
            response: response.map(str::to_string),
        }
    }
}

/// Cuts each message to `limit` chars, marking cut messages with a trailing `...`.
pub fn truncate_prompt(prompt: &[Message], limit: usize) -> Vec<Message> {
    prompt
        .iter()
        .map(|m| match m.content.char_indices().nth(limit) {
            Some((cut, _)) => Message {
                role: m.role,
                content: format!("{}...", &m.content[..cut]),
            },
            None => m.clone(),
        })
        .collect()
}

/// Write-only sink for interaction records. Implementations must not fail the caller.
pub trait DashboardSink: Send + Sync {
    fn log(&self, record: &InteractionRecord);
}

/// Emits each record as a `dashboard` tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DashboardSink for TracingSink {
    fn log(&self, record: &InteractionRecord) {
        match serde_json::to_string(record) {
            Ok(json) => info!(target: "dashboard", model = %record.model, record = %json),
            Err(err) => info!(
                target: "dashboard",
                model = %record.model,
                error = %err,
                "unserializable record"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::memory::Role;

    #[test]
    fn long_messages_are_cut_at_limit() {
        let long = "a".repeat(2500);
        let out = truncate_prompt(&[Message::system(long), Message::user("short")], 2000);
        assert_eq!(out[0].content.len(), 2003);
        assert!(out[0].content.ends_with("..."));
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[1].content, "short");
    }

    #[test]
    fn exactly_limit_is_untouched() {
        let exact = "b".repeat(2000);
        let out = truncate_prompt(&[Message::user(exact.clone())], 2000);
        assert_eq!(out[0].content, exact);
    }

    #[test]
    fn cut_respects_char_boundaries() {
        let text = "é".repeat(10);
        let out = truncate_prompt(&[Message::user(text)], 4);
        assert_eq!(out[0].content, "éééé...");
    }

    #[test]
    fn record_serializes_expected_shape() {
        let rec = InteractionRecord::new(&[Message::user("u")], "m", Some("r"));
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "prompt": [{"role": "user", "content": "u"}],
                "model": "m",
                "response": "r"
            })
        );
    }
}
