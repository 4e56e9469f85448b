//! Provider-agnostic request, response, and event types

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Message, Role, ToolCall};
pub use request::ChatRequest;
pub use response::{FinishReason, GenerateResult, Usage};
pub use stream::StreamEvent;
pub use tool::{ToolChoice, ToolDefinition};
