use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat-completion message. Serializes as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub const INVALID_RESPONSE_PREFIX: &str = "your last response was not valid because: ";

/// Append-only log of every exchange an actor has had with its provider.
///
/// Nothing is evicted; prompts only ever read a suffix via [`ConversationHistory::window`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversationHistory {
    entries: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// The last `n` entries in their original order.
    pub fn window(&self, n: usize) -> &[Message] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn push(&mut self, msg: Message) {
        self.entries.push(msg);
    }

    /// Records an attempt whose response parsed into an action.
    pub fn record_success(&mut self, prompt: &str, content: &str) {
        self.entries.push(Message::user(prompt));
        self.entries.push(Message::assistant(content));
    }

    /// Records a failed attempt: the prompt, whatever content came back (if any), and a
    /// system diagnostic so the next attempt's window carries the failure reason.
    pub fn record_failure(&mut self, prompt: &str, content: Option<&str>, reason: &str) {
        self.entries.push(Message::user(prompt));
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            self.entries.push(Message::assistant(content));
        }
        self.entries
            .push(Message::system(format!("{INVALID_RESPONSE_PREFIX}{reason}")));
    }
}
