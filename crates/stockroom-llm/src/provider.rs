//! Chat model abstraction and the proxy-backed implementation

use async_trait::async_trait;
use reqwest::StatusCode;
use stockroom_config::{LlmConfig, ProxyConfig};

use crate::convert::request_body;
use crate::error::LlmError;
use crate::event_stream::{EventStream, StreamSettings, decode_event_stream};
use crate::protocol::WireResponse;
use crate::transport::ProxyTransport;
use crate::types::{ChatRequest, GenerateResult, Message};

/// A chat model that can answer in one piece or as a stream of events
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier sent upstream
    fn model_id(&self) -> &str;

    /// Request for this model carrying any configured sampling defaults
    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(self.model_id(), messages)
    }

    /// Complete without streaming
    async fn generate(&self, request: &ChatRequest) -> Result<GenerateResult, LlmError>;

    /// Complete as a stream of normalized events
    ///
    /// Errors before the first event (status, missing body) are returned
    /// directly; later failures arrive as stream items.
    async fn stream(&self, request: &ChatRequest) -> Result<EventStream, LlmError>;
}

/// Chat model reached through the Skyfire payment proxy
#[derive(Debug, Clone)]
pub struct ProxyChatModel {
    transport: ProxyTransport,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    include_usage: bool,
    settings: StreamSettings,
}

impl ProxyChatModel {
    /// Create from proxy and model configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the transport cannot be built.
    pub fn new(proxy: &ProxyConfig, llm: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            transport: ProxyTransport::new(proxy, &llm.chat_path)?,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            include_usage: llm.include_usage,
            settings: StreamSettings::from(llm),
        })
    }
}

#[async_trait]
impl ChatModel for ProxyChatModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(self.model.clone(), messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    async fn generate(&self, request: &ChatRequest) -> Result<GenerateResult, LlmError> {
        let body = request_body(request, false, false)?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "sending completion");

        let response = self.transport.post(&body).await?;

        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!(model = %request.model, error = %e, "failed to read completion body");
            LlmError::transport(format!("failed to read response body: {e}"))
        })?;

        let wire: WireResponse = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(model = %request.model, error = %e, "failed to parse completion");
            LlmError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        GenerateResult::try_from(wire)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<EventStream, LlmError> {
        let body = request_body(request, true, self.include_usage)?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "opening completion stream");

        let response = self.transport.post(&body).await?;

        if response.status() == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            tracing::error!(model = %request.model, status = response.status().as_u16(), "stream response has no body");
            return Err(LlmError::StreamBodyMissing);
        }

        Ok(decode_event_stream(response.bytes_stream(), self.settings))
    }
}
