//! Bot core: turns live game snapshots into validated actions by prompting an LLM.
//!
//! The hosting runtime creates one [`agent::Actor`] per bot and calls
//! [`agent::Actor::on_event`] once per environment event.

pub mod agent;
pub mod llm;
