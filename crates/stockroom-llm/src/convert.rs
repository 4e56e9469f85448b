//! Conversion between internal types and the wire format

use serde_json::Value;

use crate::error::LlmError;
use crate::protocol::{
    WireChoiceMessage, WireFunction, WireFunctionCall, WireMessage, WireRequest, WireResponse, WireStreamOptions,
    WireTool, WireToolCall, WireUsage,
};
use crate::types::{ChatRequest, FinishReason, GenerateResult, Message, Role, ToolCall, ToolChoice, ToolDefinition, Usage};

// -- Outbound: internal types -> wire format --

/// Build the JSON body for a chat completion call
///
/// Standard fields are written first; `request.extra` is merged on top and
/// wins on key collisions.
pub fn request_body(request: &ChatRequest, stream: bool, include_usage: bool) -> Result<Value, LlmError> {
    let wire = WireRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(WireMessage::from).collect(),
        stream,
        stream_options: (stream && include_usage).then_some(WireStreamOptions { include_usage: true }),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: request.tools.iter().map(WireTool::from).collect(),
        tool_choice: request.tool_choice.as_ref().map(tool_choice_value),
    };

    let mut body = serde_json::to_value(wire)
        .map_err(|e| LlmError::InvalidRequest(format!("failed to serialize request: {e}")))?;

    if let Value::Object(fields) = &mut body {
        for (key, value) in &request.extra {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(body)
}

const fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let calls_only = message.role == Role::Assistant && message.content.is_empty() && !message.tool_calls.is_empty();

        Self {
            role: role_str(message.role),
            content: (!calls_only).then(|| message.content.clone()),
            tool_calls: (!message.tool_calls.is_empty())
                .then(|| message.tool_calls.iter().map(WireToolCall::from).collect()),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function".to_owned(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

fn tool_choice_value(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => Value::from("auto"),
        ToolChoice::None => Value::from("none"),
        ToolChoice::Required => Value::from("required"),
        ToolChoice::Function(name) => serde_json::json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

// -- Inbound: wire format -> internal types --

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let id = if call.id.is_empty() {
            call.function.name.clone()
        } else {
            call.id
        };

        Self {
            id,
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

fn message_tool_calls(message: WireChoiceMessage) -> Vec<ToolCall> {
    let mut calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(ToolCall::from)
        .collect();

    if let Some(legacy) = message.function_call {
        calls.push(ToolCall {
            id: legacy.name.clone(),
            name: legacy.name,
            arguments: legacy.arguments,
        });
    }

    calls
}

impl TryFrom<WireResponse> for GenerateResult {
    type Error = LlmError;

    fn try_from(response: WireResponse) -> Result<Self, Self::Error> {
        let Some(choice) = response.choices.and_then(|choices| choices.into_iter().next()) else {
            return Err(LlmError::InvalidResponse("response contained no choices".to_owned()));
        };

        let usage = response.usage.map_or_else(
            || {
                tracing::warn!("response carried no usage, reporting zero tokens");
                Usage::default()
            },
            Usage::from,
        );

        let text = choice.message.content.clone().unwrap_or_default();

        Ok(Self {
            text,
            finish_reason: choice.finish_reason.filter(|r| !r.is_empty()).map(FinishReason::from),
            usage,
            tool_calls: message_tool_calls(choice.message),
        })
    }
}
