use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// Reason the model stopped generating
///
/// Parsing never fails: values outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the token limit
    Length,
    /// Model called one or more tools
    ToolCalls,
    /// Model called a function (legacy format)
    FunctionCall,
    /// Output was filtered
    ContentFilter,
    /// Anything else upstream reported
    Other(String),
}

impl FinishReason {
    /// Upstream spelling of this reason
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::FunctionCall => "function_call",
            Self::ContentFilter => "content_filter",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "function_call" => Self::FunctionCall,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
}

impl Usage {
    pub const fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Result of a non-streaming completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResult {
    /// Assistant text; empty when upstream sent null content
    pub text: String,
    /// Why generation stopped, when upstream said
    pub finish_reason: Option<FinishReason>,
    /// Token usage; zero when upstream omitted it
    pub usage: Usage,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reason_round_trips_verbatim() {
        let reason = FinishReason::from("eos_token");
        assert_eq!(reason, FinishReason::Other("eos_token".to_owned()));
        assert_eq!(reason.as_str(), "eos_token");
        assert_eq!(serde_json::to_string(&reason).unwrap(), "\"eos_token\"");
    }

    #[test]
    fn known_reasons_parse() {
        let reason: FinishReason = serde_json::from_str("\"tool_calls\"").unwrap();
        assert_eq!(reason, FinishReason::ToolCalls);
        assert_eq!(FinishReason::from("function_call").to_string(), "function_call");
    }

    #[test]
    fn total_saturates() {
        let usage = Usage {
            prompt_tokens: u32::MAX,
            completion_tokens: 1,
        };
        assert_eq!(usage.total_tokens(), u32::MAX);
    }
}
