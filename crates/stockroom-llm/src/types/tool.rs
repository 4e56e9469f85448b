use serde::{Deserialize, Serialize};

/// Function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// What the function does, shown to the model
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: serde_json::Value,
}

/// Directive controlling whether and which tool the model calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides
    Auto,
    /// Model must not call tools
    None,
    /// Model must call some tool
    Required,
    /// Model must call the named function
    Function(String),
}
