//! Image shopping assistant
//!
//! Wires the chat model to the image catalog: declares the tools the model
//! may call, executes them as their calls stream in, and keeps the
//! conversation history between turns.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod catalog;
pub mod error;
pub mod instructions;
pub mod session;
pub mod tools;

pub use catalog::ImageCatalog;
pub use error::AgentError;
pub use session::{ChatSession, TurnOutcome, TurnSink, TurnSummary};
pub use tools::{ToolKind, ToolResult, Toolbox};
