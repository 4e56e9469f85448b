//! Chat completion wire format spoken through the proxy
//!
//! Inbound types are deliberately lenient: every field defaults, so a chunk
//! only fails to decode when a present field has the wrong shape.

use serde::{Deserialize, Deserializer, Serialize};

// -- Request types --

/// Chat completion request body, before `extra` fields are merged in
#[derive(Debug, Clone, Serialize)]
pub struct WireRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<WireMessage>,
    /// Whether to stream the response
    pub stream: bool,
    /// Stream options (e.g. `include_usage`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<WireStreamOptions>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool definitions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    /// Tool choice directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

/// Stream options
#[derive(Debug, Clone, Serialize)]
pub struct WireStreamOptions {
    /// Report usage on the final chunk
    pub include_usage: bool,
}

/// Message within a request
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    /// `system`, `user`, `assistant` or `tool`
    pub role: &'static str,
    /// Text content; null for assistant turns that only called tools
    pub content: Option<String>,
    /// Tool calls made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Call this tool message answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool definition
#[derive(Debug, Clone, Serialize)]
pub struct WireTool {
    /// Always `function`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

/// Function declaration
#[derive(Debug, Clone, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments
    pub parameters: serde_json::Value,
}

/// Tool call inside an assistant message, in either direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Call ID
    #[serde(default)]
    pub id: String,
    /// Always `function`
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunctionCall,
}

/// Function name and complete arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFunctionCall {
    #[serde(default)]
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_owned()
}

// -- Response types --

/// Non-streaming response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub choices: Option<Vec<WireChoice>>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// Choice within a non-streaming response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChoice {
    #[serde(default)]
    pub message: WireChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message within a response choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Legacy single function call
    #[serde(default)]
    pub function_call: Option<WireFunctionCall>,
}

/// Token counters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

/// Error body returned with a non-success status
///
/// The proxy answers `{ "code", "message" }`; `OpenAI`-style upstreams
/// nest the same fields under `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<WireErrorDetail>,
}

/// Nested error detail
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireErrorDetail {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

// -- Streaming types --

/// One decoded stream line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    /// `null` decodes as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    /// Mid-stream error object some upstreams send instead of a choice
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Choice within a chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental content within a chunk choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    /// Legacy function-call fragment
    #[serde(default)]
    pub function_call: Option<FunctionCallDelta>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Tool-call fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call in the `tool_calls` array
    #[serde(default)]
    pub index: Option<u32>,
    /// Present on the first fragment only
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallDelta>,
}

/// Function name and argument fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_with_only_usage_decodes() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":2}}"#).unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.usage.and_then(|u| u.prompt_tokens), Some(3));
    }

    #[test]
    fn null_fields_are_tolerated() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"id":"gen-1","choices":[{"index":0,"delta":{"content":null,"role":"assistant"},"finish_reason":null}],"usage":null}"#,
        )
        .unwrap();
        let choice = &chunk.choices[0];
        assert!(choice.finish_reason.is_none());
        assert!(choice.delta.as_ref().is_some_and(|d| d.content.is_none()));
    }

    #[test]
    fn null_choices_keep_usage() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":null,"usage":{"prompt_tokens":3,"completion_tokens":1}}"#).unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.usage.and_then(|u| u.completion_tokens), Some(1));
    }

    #[test]
    fn mistyped_field_is_rejected() {
        assert!(serde_json::from_str::<ChatChunk>(r#"{"choices":"none"}"#).is_err());
    }
}
