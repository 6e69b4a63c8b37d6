use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InitialState,
    Chat,
    Message,
    CommandExecuted,
    Idle,
    Health,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::InitialState => "initial_state",
            EventKind::Chat => "chat",
            EventKind::Message => "message",
            EventKind::CommandExecuted => "command_executed",
            EventKind::Idle => "idle",
            EventKind::Health => "health",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}, {:.2}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
    pub sender: String,
    pub chat: String,
}

/// Environment state delivered with one event. Read once while assembling the prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EnvironmentSnapshot {
    /// The actor's in-game name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub event: Option<EventKind>,
    /// Output of the previously executed code, if any.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// 0.0..=1.0
    #[serde(default)]
    pub health: f64,
}

fn or_none(value: Option<String>) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "None".to_string())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

impl EnvironmentSnapshot {
    pub fn health_display(&self) -> i64 {
        (self.health.clamp(0.0, 1.0) * 100.0).round() as i64
    }

    /// Deterministic text rendering used as the final user message of every prompt.
    pub fn render(&self) -> String {
        let mut parts = vec![
            format!("Event received: {}", or_none(self.event.map(|e| e.to_string()))),
            format!("Command Output:\n{}", or_none(self.output.clone())),
            format!("Position: {}", or_none(self.position.map(|p| p.to_string()))),
        ];

        if !self.chat_messages.is_empty() {
            let chat = self
                .chat_messages
                .iter()
                .map(|m| format!("{}: {}", m.sender, m.chat))
                .collect::<Vec<_>>()
                .join("; ");
            parts.push(format!("Latest Chat: {chat}"));
        }

        let inventory = self
            .inventory
            .iter()
            .map(|(name, count)| format!("{count} {name}"))
            .collect::<Vec<_>>();

        parts.extend([
            format!("Visible Players: {}", join_or_none(&self.players)),
            format!("Visible Blocks: {}", join_or_none(&self.blocks)),
            format!("Visible Entities: {}", join_or_none(&self.entities)),
            format!("Inventory: {}", join_or_none(&inventory)),
            format!("Health: {}/100", self.health_display()),
        ]);

        parts.join("\n\n")
    }
}
