use super::message::ToolCall;
use super::response::{FinishReason, Usage};

/// Normalized event produced while streaming a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental assistant text
    TextDelta(String),
    /// Completed tool call
    ToolCall(ToolCall),
    /// End of the response, emitted at most once
    Finish {
        /// Last finish reason reported upstream
        reason: FinishReason,
        /// Last usage reported upstream
        usage: Usage,
    },
}
