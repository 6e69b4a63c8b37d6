//! Retry controller: assemble -> dispatch -> parse, replaying with feedback on failure.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::ActorConfig;
use super::dashboard::{DashboardSink, InteractionRecord};
use super::fragments::PromptTemplates;
use super::memory::ConversationHistory;
use super::observation::EnvironmentSnapshot;
use super::prompt::assemble;
use super::wire::{Action, ActionResponse, ParseError, parse_action};
use crate::llm::{ProviderClient, ProviderError};

pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I'm having trouble generating a response. Please try again later.";

/// Why one attempt failed. Both kinds are retried the same way.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessOutcome {
    /// A response parsed on attempt `attempts` (1-based).
    Succeeded { action: Action, attempts: u32 },
    /// Every attempt failed; `last_error` is the final attempt's failure.
    Exhausted {
        attempts: u32,
        last_error: Option<AttemptError>,
    },
}

impl HarnessOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            HarnessOutcome::Succeeded { attempts, .. }
            | HarnessOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_response(self, delay_ms: u64) -> ActionResponse {
        match self {
            HarnessOutcome::Succeeded { action, .. } => ActionResponse::new(action, delay_ms),
            HarnessOutcome::Exhausted { .. } => ActionResponse::new(
                Action {
                    code: String::new(),
                    message: FALLBACK_MESSAGE.to_string(),
                },
                delay_ms,
            ),
        }
    }
}

/// Everything one event needs. History is the only shared mutable piece.
pub struct HarnessContext<'a> {
    pub cfg: &'a ActorConfig,
    pub templates: &'a PromptTemplates,
    pub history: &'a Mutex<ConversationHistory>,
    pub provider: &'a dyn ProviderClient,
    pub sink: &'a dyn DashboardSink,
}

/// Runs up to `cfg.max_retries` attempts for one snapshot.
///
/// Each attempt reads the history as extended by the previous failure, so the diagnostic
/// message lands in the next prompt's window. Never returns an error: exhaustion is an outcome.
pub async fn handle_event(
    ctx: &HarnessContext<'_>,
    snapshot: &EnvironmentSnapshot,
) -> HarnessOutcome {
    let cfg = ctx.cfg;
    let mut last_error = None;

    for attempt in 1..=cfg.max_retries {
        // Lock only while copying the window; never across the provider call.
        let messages = {
            let history = ctx.history.lock();
            assemble(snapshot, &history, cfg, ctx.templates)
        };
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let (content, parsed) = match ctx.provider.get_chat_completion(&messages).await {
            Ok(resp) => {
                let parsed = parse_action(&resp.content).map_err(AttemptError::from);
                if parsed.is_err() {
                    debug!(attempt, raw = %resp.raw, "provider envelope for rejected content");
                }
                (Some(resp.content), parsed)
            }
            Err(err) => (None, Err(AttemptError::from(err))),
        };

        ctx.sink
            .log(&InteractionRecord::new(&messages, &cfg.model, content.as_deref()));

        match parsed {
            Ok(action) => {
                ctx.history
                    .lock()
                    .record_success(&prompt, content.as_deref().unwrap_or_default());
                debug!(attempt, model = %cfg.model, "llm action accepted");
                return HarnessOutcome::Succeeded {
                    action,
                    attempts: attempt,
                };
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(
                    attempt,
                    max = cfg.max_retries,
                    model = %cfg.model,
                    %reason,
                    "llm attempt failed"
                );
                ctx.history
                    .lock()
                    .record_failure(&prompt, content.as_deref(), &reason);
                last_error = Some(err);
            }
        }
    }

    warn!(attempts = cfg.max_retries, model = %cfg.model, "llm retries exhausted, falling back");
    HarnessOutcome::Exhausted {
        attempts: cfg.max_retries,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use serde_json::Value;

    use super::*;
    use crate::agent::memory::{Message, Role};
    use crate::llm::{ProviderErrorCategory, ProviderFuture, ProviderResponse};

    #[derive(Default)]
    struct FakeProvider {
        responses: StdMutex<VecDeque<Result<String, ProviderError>>>,
        prompts: StdMutex<Vec<Vec<Message>>>,
    }

    impl FakeProvider {
        fn push_response(&self, raw: impl Into<String>) {
            self.responses.lock().unwrap().push_back(Ok(raw.into()));
        }

        fn push_error(&self, err: ProviderError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl ProviderClient for FakeProvider {
        fn get_chat_completion<'a>(&'a self, messages: &'a [Message]) -> ProviderFuture<'a> {
            Box::pin(async move {
                self.prompts.lock().unwrap().push(messages.to_vec());
                let next = self
                    .responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok("still not json".to_string()));
                next.map(|content| ProviderResponse::new(content, Value::Null))
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: StdMutex<Vec<InteractionRecord>>,
    }

    impl DashboardSink for RecordingSink {
        fn log(&self, record: &InteractionRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    struct Fixture {
        cfg: ActorConfig,
        templates: PromptTemplates,
        history: Mutex<ConversationHistory>,
        provider: FakeProvider,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cfg: ActorConfig::default(),
                templates: PromptTemplates::default(),
                history: Mutex::new(ConversationHistory::new()),
                provider: FakeProvider::default(),
                sink: RecordingSink::default(),
            }
        }

        async fn run(&self) -> HarnessOutcome {
            let ctx = HarnessContext {
                cfg: &self.cfg,
                templates: &self.templates,
                history: &self.history,
                provider: &self.provider,
                sink: &self.sink,
            };
            handle_event(&ctx, &EnvironmentSnapshot::default()).await
        }
    }

    #[tokio::test]
    async fn first_attempt_success_records_one_exchange() {
        let fx = Fixture::new();
        fx.provider
            .push_response(r#"{"code":"await skills.jump(bot);","message":"hop"}"#);

        let out = fx.run().await;
        assert_eq!(out.attempts(), 1);
        let resp = out.into_response(fx.cfg.delay_after_action_ms);
        assert_eq!(resp.code, "await skills.jump(bot);");
        assert_eq!(resp.delay, 100);

        let history = fx.history.lock();
        let roles: Vec<_> = history.entries().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        assert_eq!(fx.sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_then_success_leaves_five_entries() {
        let fx = Fixture::new();
        fx.provider.push_response("I think I'll mine.");
        fx.provider.push_response(r#"{"code":"","message":"ok"}"#);

        let out = fx.run().await;
        assert!(matches!(out, HarnessOutcome::Succeeded { attempts: 2, .. }));

        let history = fx.history.lock();
        let entries = history.entries();
        let roles: Vec<_> = entries.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::User, Role::Assistant, Role::System, Role::User, Role::Assistant]
        );
        assert_eq!(entries[1].content, "I think I'll mine.");
        assert_eq!(
            entries[2].content,
            "your last response was not valid because: no JSON object found"
        );
    }

    #[tokio::test]
    async fn retry_prompt_carries_the_diagnostic() {
        let fx = Fixture::new();
        fx.provider.push_response("nope");
        fx.provider.push_response(r#"{"code":"x"}"#);
        fx.run().await;

        let prompts = fx.provider.prompts.lock().unwrap();
        let second = &prompts[1];
        let n = second.len();
        assert_eq!(second[n - 2].role, Role::System);
        assert!(second[n - 2].content.contains("no JSON object found"));
        assert_eq!(second[n - 1].role, Role::User);
    }

    #[tokio::test]
    async fn always_unparseable_exhausts_after_max_retries() {
        let mut fx = Fixture::new();
        fx.cfg.delay_after_action_ms = 0;

        let out = fx.run().await;
        assert_eq!(fx.provider.prompt_count(), 3);
        assert!(matches!(
            out,
            HarnessOutcome::Exhausted {
                attempts: 3,
                last_error: Some(AttemptError::Parse(_))
            }
        ));
        let resp = out.into_response(fx.cfg.delay_after_action_ms);
        assert_eq!(resp.code, "");
        assert_eq!(resp.message, FALLBACK_MESSAGE);
        assert_eq!(resp.delay, 0);
        assert_eq!(fx.history.lock().len(), 9);
    }

    #[tokio::test]
    async fn provider_errors_are_retried_without_assistant_entry() {
        let fx = Fixture::new();
        fx.provider.push_error(ProviderError::new(
            ProviderErrorCategory::Timeout,
            "request timed out after 30s",
        ));
        fx.provider.push_response(r#"{"code":"a","message":"b"}"#);

        let out = fx.run().await;
        assert_eq!(out.attempts(), 2);

        let history = fx.history.lock();
        let roles: Vec<_> = history.entries().iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::System, Role::User, Role::Assistant]);
        assert!(history.entries()[1].content.contains("timeout: request timed out"));

        let records = fx.sink.records.lock().unwrap();
        assert_eq!(records[0].response, None);
        assert_eq!(records[1].response.as_deref(), Some(r#"{"code":"a","message":"b"}"#));
    }
}
