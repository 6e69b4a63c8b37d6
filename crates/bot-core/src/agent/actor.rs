use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::config::{ActorConfig, ConfigurationError, ProviderSelection};
use super::dashboard::{DashboardSink, TracingSink};
use super::fragments::PromptTemplates;
use super::harness::{HarnessContext, HarnessOutcome, handle_event};
use super::memory::ConversationHistory;
use super::observation::{ChatMessage, EnvironmentSnapshot};
use super::wire::ActionResponse;
use crate::llm::{GuardedClient, OllamaClient, OpenRouterClient, ProviderClient};

/// Builds the provider named by `cfg.provider`, resolving credentials once.
pub fn provider_from_config(
    cfg: &ActorConfig,
) -> Result<Arc<dyn ProviderClient>, ConfigurationError> {
    let provider: Arc<dyn ProviderClient> = match cfg.provider {
        ProviderSelection::OpenRouter { .. } => Arc::new(OpenRouterClient::from_config(cfg)?),
        ProviderSelection::Ollama { .. } => Arc::new(OllamaClient::from_config(cfg)?),
    };
    Ok(provider)
}

/// One controllable bot instance: its own config, history, and in-flight guard.
///
/// Nothing here is shared between actors.
pub struct Actor {
    cfg: ActorConfig,
    templates: PromptTemplates,
    history: Mutex<ConversationHistory>,
    game_chat: Mutex<Vec<ChatMessage>>,
    provider: Arc<dyn ProviderClient>,
    sink: Arc<dyn DashboardSink>,
}

impl Actor {
    /// Validates `cfg` and connects the configured provider.
    pub fn new(cfg: ActorConfig) -> Result<Self, ConfigurationError> {
        cfg.validate()?;
        let provider = provider_from_config(&cfg)?;
        Self::with_provider(cfg, provider)
    }

    /// Uses the given provider instead of the configured one. The guard is still applied when
    /// `cfg.guard_requests` is set.
    pub fn with_provider(
        cfg: ActorConfig,
        provider: Arc<dyn ProviderClient>,
    ) -> Result<Self, ConfigurationError> {
        cfg.validate()?;
        let provider: Arc<dyn ProviderClient> = if cfg.guard_requests {
            Arc::new(GuardedClient::new(provider))
        } else {
            provider
        };

        info!(
            model = %cfg.model,
            provider = cfg.provider.name(),
            delay_ms = cfg.delay_after_action_ms,
            max_retries = cfg.max_retries,
            guarded = cfg.guard_requests,
            "actor created"
        );

        Ok(Self {
            cfg,
            templates: PromptTemplates::default(),
            history: Mutex::new(ConversationHistory::new()),
            game_chat: Mutex::new(Vec::new()),
            provider,
            sink: Arc::new(TracingSink),
        })
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DashboardSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ActorConfig {
        &self.cfg
    }

    /// Copy of the full conversation history.
    pub fn history(&self) -> ConversationHistory {
        self.history.lock().clone()
    }

    /// Every chat message seen so far, in arrival order.
    pub fn game_chat(&self) -> Vec<ChatMessage> {
        self.game_chat.lock().clone()
    }

    /// Processes one event and reports how it went.
    pub async fn handle_event(&self, snapshot: &EnvironmentSnapshot) -> HarnessOutcome {
        self.game_chat
            .lock()
            .extend(snapshot.chat_messages.iter().cloned());

        let ctx = HarnessContext {
            cfg: &self.cfg,
            templates: &self.templates,
            history: &self.history,
            provider: self.provider.as_ref(),
            sink: self.sink.as_ref(),
        };
        handle_event(&ctx, snapshot).await
    }

    /// Processes one event and returns the action for the hosting runtime.
    pub async fn on_event(&self, snapshot: &EnvironmentSnapshot) -> ActionResponse {
        self.handle_event(snapshot)
            .await
            .into_response(self.cfg.delay_after_action_ms)
    }
}
