use serde::Deserialize;

/// Assistant behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Replaces the built-in persona prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Largest batch `purchase_images` executes without an explicit confirmation turn
    #[serde(default = "default_max_purchase")]
    pub max_purchase_without_confirmation: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_purchase_without_confirmation: default_max_purchase(),
        }
    }
}

const fn default_max_purchase() -> usize {
    5
}
