//! Default prompt fragments. Placeholders are filled by [`super::template::substitute`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptTemplates {
    /// Task framing. Slots: `$NAME`, `$TASK`, `$AGENT_MODE`, `$CREATIVE_MODE`.
    pub coding: String,
    /// Capability reference. Slot: `$CODE_DOCS`.
    pub skills: String,
    /// Slot: `$AGENT_MODE`.
    pub agent_modes: String,
    /// Slot: `$EXAMPLES`.
    pub examples: String,
    /// Slot: `$PERSONA`.
    pub persona: String,
    pub creative_mode: String,
    pub survival_mode: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            coding: "You are a mineflayer bot named $NAME that plays Minecraft by writing short \
                javascript code blocks.\nYour current goal is: $TASK.\n$CREATIVE_MODE\n\
                Each turn the user tells you which event happened, the output of your previous \
                code, your position, inventory, health and what you can see.\n\
                Reply with one JSON object: {\"code\": \"<javascript>\", \"message\": \"<chat text>\"}. \
                Nothing else.\n\
                Code is the only way to act. Empty code means you do nothing and will not be \
                called back; put a console.log in code if you want another turn. Every async \
                call MUST be awaited. Keep code to at most 3 lines, read the result, then continue.\n\
                Your configuration: $AGENT_MODE"
                .to_string(),
            skills: "Reference for the code you can write: $CODE_DOCS".to_string(),
            agent_modes: "Modes active in this challenge: $AGENT_MODE".to_string(),
            examples: "Example conversations: $EXAMPLES".to_string(),
            persona: "Your persona: $PERSONA".to_string(),
            creative_mode: "You are in creative mode: do not collect blocks, you can place any \
                block anywhere even if it is not in your inventory."
                .to_string(),
            survival_mode: "You are in survival mode.".to_string(),
        }
    }
}

/// Few-shot demonstrations substituted into `$EXAMPLES`.
pub fn coding_examples() -> Value {
    json!([
        [
            {"role": "user", "content": "greg: Collect 10 wood"},
            {"role": "assistant", "content": {
                "code": "await skills.collectBlock(bot, 'oak_log', 10);",
                "message": "Collecting oak logs."
            }}
        ],
        [
            {"role": "user", "content": "bobby: cook some chicken"},
            {"role": "assistant", "content": {
                "code": "await skills.smeltItem(bot, 'chicken', 8);",
                "message": "Cooking 8 chicken."
            }}
        ],
        [
            {"role": "user", "content": "zZZn98: come here"},
            {"role": "assistant", "content": {
                "code": "await skills.goToPlayer(bot, 'zZZn98');",
                "message": "I'm coming!"
            }}
        ],
        [
            {"role": "user", "content": "234jeb: build a little tower"},
            {"role": "assistant", "content": {
                "code": "let pos = bot.entity.position;\nfor (let i = 0; i < 5; i++) {\n    await skills.placeBlock(bot, 'dirt', pos.x, pos.y + i, pos.z);\n}",
                "message": "Placed 5 dirt."
            }}
        ]
    ])
}
