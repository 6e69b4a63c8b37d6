use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the model asked the bot to do.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Action {
    /// Opaque code for the external executor. Empty means "do nothing this turn".
    #[serde(default)]
    pub code: String,
    /// Chat text.
    #[serde(default)]
    pub message: String,
}

/// Action plus the post-action delay, as handed back to the hosting runtime.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActionResponse {
    pub code: String,
    pub message: String,
    /// Milliseconds.
    pub delay: u64,
}

impl ActionResponse {
    pub fn new(action: Action, delay: u64) -> Self {
        Self {
            code: action.code,
            message: action.message,
            delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    NoContent,
    NoJsonObject,
    InvalidJson,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::NoContent => write!(f, "no content extracted"),
            ParseFailure::NoJsonObject => write!(f, "no JSON object found"),
            ParseFailure::InvalidJson => write!(f, "invalid JSON"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct ParseError {
    pub reason: ParseFailure,
    pub detail: Option<String>,
}

impl ParseError {
    fn new(reason: ParseFailure) -> Self {
        Self {
            reason,
            detail: None,
        }
    }
}

/// Returns the span from the first `{` to the last `}` inclusive.
///
/// Models wrap JSON in prose and code fences; the outermost braces are all we trust.
pub fn extract_action_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// Parses a model response into an [`Action`].
///
/// Checks, in order: empty content, missing `{...}` span, invalid JSON. Missing `code`/`message`
/// default to empty; unknown fields are ignored.
pub fn parse_action(content: &str) -> Result<Action, ParseError> {
    if content.is_empty() {
        return Err(ParseError::new(ParseFailure::NoContent));
    }

    let json_str =
        extract_action_json(content).ok_or(ParseError::new(ParseFailure::NoJsonObject))?;

    serde_json::from_str::<Action>(json_str).map_err(|e| ParseError {
        reason: ParseFailure::InvalidJson,
        detail: Some(format!("{e} in {json_str}")),
    })
}
