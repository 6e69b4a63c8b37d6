//! Action orchestration for one bot: prompt assembly, response parsing, and the retry loop.
//!
//! Data flow per event: snapshot -> [`prompt::assemble`] (reads history) -> provider (behind the
//! in-flight guard) -> [`wire::parse_action`] -> [`harness::handle_event`] records the exchange
//! and either returns the action or replays with the failure reason in history.

pub mod actor;
pub mod config;
pub mod dashboard;
pub mod fragments;
pub mod harness;
pub mod memory;
pub mod observation;
pub mod prompt;
pub mod template;
pub mod wire;

pub use actor::Actor;
pub use config::{ActorConfig, ChallengeInfo, ConfigurationError, ProviderSelection};
pub use harness::{AttemptError, FALLBACK_MESSAGE, HarnessOutcome};
pub use memory::{ConversationHistory, Message, Role};
pub use observation::EnvironmentSnapshot;
pub use wire::{Action, ActionResponse, ParseError, ParseFailure, parse_action};
