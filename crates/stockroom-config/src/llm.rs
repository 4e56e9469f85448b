use serde::Deserialize;

/// Chat model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Model identifier sent upstream
    #[serde(default = "default_model")]
    pub model: String,
    /// Chat completion path on the proxy
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// How streamed tool-call fragments are assembled
    #[serde(default)]
    pub tool_calls: ToolCallMode,
    /// What happens when a stream ends without the `[DONE]` sentinel
    #[serde(default)]
    pub truncation: TruncationPolicy,
    /// Ask upstream to report usage on the final stream chunk
    #[serde(default = "default_true")]
    pub include_usage: bool,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            chat_path: default_chat_path(),
            tool_calls: ToolCallMode::default(),
            truncation: TruncationPolicy::default(),
            include_usage: true,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Tool-call assembly strategy for streamed responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallMode {
    /// Concatenate argument fragments and emit one call per upstream call
    #[default]
    Accumulate,
    /// Emit every fragment as its own call; only correct when upstream
    /// sends each call in a single fragment
    PerFragment,
}

/// Behavior when the byte stream closes before the sentinel line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Surface a truncated-stream error as the final item
    #[default]
    Error,
    /// End the stream silently without a finish event
    Drop,
}

fn default_model() -> String {
    "openai/chatgpt-4o-latest".to_owned()
}

fn default_chat_path() -> String {
    "/proxy/openrouter/v1/chat/completions".to_owned()
}

const fn default_true() -> bool {
    true
}
