//! Streaming chat-completion adapter for the Skyfire payment proxy
//!
//! Requests travel as `OpenAI`-style JSON through the proxy. Streamed
//! responses are split into lines, decoded leniently, and normalized into
//! [`StreamEvent`]s: text deltas, completed tool calls, and a single
//! finish event carrying the finish reason and token usage.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod decoder;
pub mod error;
pub mod event_stream;
pub mod normalizer;
pub mod protocol;
pub mod provider;
pub mod transport;
pub mod types;

pub use error::{AuthFailure, DecodeError, LlmError};
pub use event_stream::{EventStream, StreamSettings};
pub use provider::{ChatModel, ProxyChatModel};
pub use types::{
    ChatRequest, FinishReason, GenerateResult, Message, Role, StreamEvent, ToolCall, ToolChoice, ToolDefinition,
    Usage,
};
