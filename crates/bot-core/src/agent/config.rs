use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OLLAMA_API_URL_ENV: &str = "OLLAMA_API_URL";
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Keys shorter than this are placeholders, not credentials.
const MIN_API_KEY_LEN: usize = 20;

/// Fatal setup errors. Raised once while creating an actor and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("missing endpoint: {0}")]
    MissingEndpoint(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderSelection {
    OpenRouter {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    Ollama {
        #[serde(default)]
        url: Option<String>,
    },
}

impl Default for ProviderSelection {
    fn default() -> Self {
        ProviderSelection::OpenRouter {
            api_key: None,
            endpoint: None,
        }
    }
}

impl ProviderSelection {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSelection::OpenRouter { .. } => "openrouter",
            ProviderSelection::Ollama { .. } => "ollama",
        }
    }

    /// Parses the short provider names accepted on the command line / environment.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Some(ProviderSelection::OpenRouter {
                api_key: None,
                endpoint: None,
            }),
            "ollama" => Some(ProviderSelection::Ollama { url: None }),
            _ => None,
        }
    }
}

/// Challenge parameters handed to the actor when it joins a run.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ChallengeInfo {
    #[serde(default)]
    pub task: String,
    /// Game modes for this run, e.g. `{"mcmode": "creative", "self_preservation": true}`.
    #[serde(default)]
    pub agent_modes: BTreeMap<String, serde_json::Value>,
    /// Reference docs for the code vocabulary the bot may use.
    #[serde(default)]
    pub js_functions: serde_json::Value,
}

impl ChallengeInfo {
    pub fn is_creative(&self) -> bool {
        self.agent_modes
            .get("mcmode")
            .and_then(|v| v.as_str())
            .is_some_and(|mode| mode == "creative")
    }
}

fn default_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_persona() -> String {
    "you are a cool resourceful agent. you really want to achieve the task that has been given to you."
        .to_string()
}

fn default_delay_ms() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_history_window() -> usize {
    5
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Per-actor configuration. Fixed for the actor's lifetime.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default)]
    pub provider: ProviderSelection,
    /// Delay (ms) the external executor waits after performing the returned action.
    #[serde(default = "default_delay_ms")]
    pub delay_after_action_ms: u64,
    /// Total provider attempts per event before falling back.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// When false, overlapping events may each issue a provider call.
    #[serde(default = "default_true")]
    pub guard_requests: bool,
    #[serde(default)]
    pub challenge: ChallengeInfo,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            persona: default_persona(),
            provider: ProviderSelection::default(),
            delay_after_action_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            history_window: default_history_window(),
            request_timeout_ms: default_request_timeout_ms(),
            guard_requests: true,
            challenge: ChallengeInfo::default(),
        }
    }
}

impl ActorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigurationError::Invalid("model must be set".to_string()));
        }
        if self.max_retries == 0 {
            return Err(ConfigurationError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.history_window == 0 {
            return Err(ConfigurationError::Invalid(
                "history_window must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid(
                "request_timeout_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

fn usable_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string())
        .filter(|k| k.len() >= MIN_API_KEY_LEN)
}

/// Picks the OpenRouter key: the environment wins over the config file.
pub fn resolve_api_key(
    env_value: Option<String>,
    configured: Option<&str>,
) -> Result<String, ConfigurationError> {
    usable_key(env_value)
        .or_else(|| usable_key(configured.map(str::to_string)))
        .ok_or(ConfigurationError::MissingCredential(OPENROUTER_API_KEY_ENV))
}

/// Picks the Ollama chat endpoint: the environment wins over the config file.
pub fn resolve_ollama_url(
    env_value: Option<String>,
    configured: Option<&str>,
) -> Result<String, ConfigurationError> {
    let non_empty = |u: String| Some(u.trim().to_string()).filter(|u| !u.is_empty());
    env_value
        .and_then(non_empty)
        .or_else(|| configured.map(str::to_string).and_then(non_empty))
        .ok_or(ConfigurationError::MissingEndpoint(OLLAMA_API_URL_ENV))
}
