use serde_json::Value;

use super::config::ActorConfig;
use super::fragments::{PromptTemplates, coding_examples};
use super::memory::{ConversationHistory, Message};
use super::observation::EnvironmentSnapshot;
use super::template::{TemplateVars, substitute, vars};

fn agent_modes_value(cfg: &ActorConfig) -> Value {
    serde_json::to_value(&cfg.challenge.agent_modes).unwrap_or(Value::Null)
}

/// System messages in fixed order: task framing, capabilities, modes, examples, persona.
pub fn build_system_messages(
    snapshot: &EnvironmentSnapshot,
    cfg: &ActorConfig,
    templates: &PromptTemplates,
) -> Vec<Message> {
    let creative_mode = if cfg.challenge.is_creative() {
        &templates.creative_mode
    } else {
        &templates.survival_mode
    };
    let modes = agent_modes_value(cfg);

    let framing: TemplateVars = vars([
        ("NAME", Value::from(snapshot.name.as_str())),
        ("TASK", Value::from(cfg.challenge.task.as_str())),
        ("AGENT_MODE", modes.clone()),
        ("CREATIVE_MODE", Value::from(creative_mode.as_str())),
    ]);

    [
        substitute(&templates.coding, &framing),
        substitute(
            &templates.skills,
            &vars([("CODE_DOCS", cfg.challenge.js_functions.clone())]),
        ),
        substitute(&templates.agent_modes, &vars([("AGENT_MODE", modes)])),
        substitute(&templates.examples, &vars([("EXAMPLES", coding_examples())])),
        substitute(
            &templates.persona,
            &vars([("PERSONA", cfg.persona.as_str())]),
        ),
    ]
    .into_iter()
    .map(Message::system)
    .collect()
}

/// Full prompt: `[system..., history window..., user(snapshot)]`.
///
/// The final user message is always last; providers weight recency.
pub fn assemble(
    snapshot: &EnvironmentSnapshot,
    history: &ConversationHistory,
    cfg: &ActorConfig,
    templates: &PromptTemplates,
) -> Vec<Message> {
    let mut messages = build_system_messages(snapshot, cfg, templates);
    messages.extend_from_slice(history.window(cfg.history_window));
    messages.push(Message::user(snapshot.render()));
    messages
}
