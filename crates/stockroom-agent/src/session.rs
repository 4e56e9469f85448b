//! One conversation with the assistant

use std::sync::Arc;

use futures_util::StreamExt;
use stockroom_config::{AgentConfig, Config};
use stockroom_images::GettyClient;
use stockroom_llm::{ChatModel, ChatRequest, FinishReason, Message, ProxyChatModel, StreamEvent, ToolCall, Usage};
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::instructions::system_prompts;
use crate::tools::{ToolResult, Toolbox, definitions};

/// Receives a turn's output as it happens
pub trait TurnSink: Send {
    /// Assistant text as it streams in
    fn text(&mut self, _delta: &str) {}

    /// A tool call is about to run
    fn tool_call(&mut self, _call: &ToolCall) {}

    /// A tool call finished
    fn tool_result(&mut self, _result: &ToolResult) {}
}

/// Everything a turn produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSummary {
    /// Full assistant text
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// One result per entry in `tool_calls`, same order
    pub tool_results: Vec<ToolResult>,
    /// Present only when the model finished normally
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed(TurnSummary),
    /// Cancelled by the caller; holds what arrived before that
    Cancelled(TurnSummary),
}

impl TurnOutcome {
    pub const fn summary(&self) -> &TurnSummary {
        match self {
            Self::Completed(summary) | Self::Cancelled(summary) => summary,
        }
    }
}

/// Conversation state plus the model and tools it talks through
pub struct ChatSession {
    model: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    system: Vec<Message>,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(model: Arc<dyn ChatModel>, toolbox: Toolbox, agent: &AgentConfig) -> Self {
        let system = system_prompts(agent.system_prompt.as_deref(), agent.max_purchase_without_confirmation)
            .into_iter()
            .map(Message::system)
            .collect();

        Self {
            model,
            toolbox,
            system,
            history: Vec::new(),
        }
    }

    /// Build the proxy-backed model and image client from configuration
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let model = ProxyChatModel::new(&config.proxy, &config.llm)?;
        let images = GettyClient::new(&config.proxy, &config.images)?;
        let toolbox = Toolbox::new(
            Arc::new(images),
            config.images.page_size,
            config.agent.max_purchase_without_confirmation,
        );

        Ok(Self::new(Arc::new(model), toolbox, &config.agent))
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Conversation so far, without the system prompts
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send `user_text` and stream the reply
    ///
    /// Text goes to `sink` as it arrives and each tool call runs as soon as
    /// it completes. History is only updated when the turn completes, is
    /// cancelled, or has already run a tool; a turn that fails before any
    /// tool ran leaves history untouched so it can be retried.
    pub async fn send(
        &mut self,
        user_text: &str,
        sink: &mut dyn TurnSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        let user = Message::user(user_text);
        let request = self.request(&user);
        let mut summary = TurnSummary::default();

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            opened = self.model.stream(&request) => Some(opened),
        };

        let Some(opened) = opened else {
            return Ok(self.finish_turn(user, summary, true));
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail_turn(user, summary, e.into())),
        };

        let cancelled = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break true,
                next = stream.next() => next,
            };

            let event = match next {
                None => break false,
                Some(Ok(event)) => event,
                Some(Err(e)) => return Err(self.fail_turn(user, summary, e.into())),
            };

            match event {
                StreamEvent::TextDelta(delta) => {
                    sink.text(&delta);
                    summary.text.push_str(&delta);
                }
                StreamEvent::ToolCall(call) => {
                    if self.run_tool(call, sink, &mut summary, cancel).await {
                        break true;
                    }
                }
                StreamEvent::Finish { reason, usage } => {
                    summary.finish_reason = Some(reason);
                    summary.usage = Some(usage);
                }
            }
        };

        Ok(self.finish_turn(user, summary, cancelled))
    }

    /// Send `user_text` and wait for the whole reply
    pub async fn generate(
        &mut self,
        user_text: &str,
        sink: &mut dyn TurnSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        let user = Message::user(user_text);
        let request = self.request(&user);
        let mut summary = TurnSummary::default();

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.model.generate(&request) => Some(result),
        };

        let Some(result) = result else {
            return Ok(self.finish_turn(user, summary, true));
        };
        let result = match result {
            Ok(result) => result,
            Err(e) => return Err(self.fail_turn(user, summary, e.into())),
        };

        if !result.text.is_empty() {
            sink.text(&result.text);
        }
        summary.text = result.text;
        summary.finish_reason = result.finish_reason;
        summary.usage = Some(result.usage);

        for call in result.tool_calls {
            if self.run_tool(call, sink, &mut summary, cancel).await {
                summary.finish_reason = None;
                summary.usage = None;
                return Ok(self.finish_turn(user, summary, true));
            }
        }

        Ok(self.finish_turn(user, summary, false))
    }

    fn request(&self, user: &Message) -> ChatRequest {
        let messages = self
            .system
            .iter()
            .chain(&self.history)
            .chain(std::iter::once(user))
            .cloned()
            .collect();

        self.model.request(messages).with_tools(definitions())
    }

    /// Execute `call`, racing it against `cancel`; true when interrupted
    async fn run_tool(
        &mut self,
        call: ToolCall,
        sink: &mut dyn TurnSink,
        summary: &mut TurnSummary,
        cancel: &CancellationToken,
    ) -> bool {
        sink.tool_call(&call);

        let (result, interrupted) = tokio::select! {
            biased;
            () = cancel.cancelled() => (ToolResult::cancelled(&call), true),
            result = self.toolbox.execute(&call) => (result, false),
        };

        sink.tool_result(&result);
        summary.tool_calls.push(call);
        summary.tool_results.push(result);

        interrupted
    }

    fn finish_turn(&mut self, user: Message, summary: TurnSummary, cancelled: bool) -> TurnOutcome {
        self.commit(user, &summary);

        if cancelled {
            tracing::info!(model = %self.model.model_id(), tools = summary.tool_calls.len(), "turn cancelled");
            TurnOutcome::Cancelled(summary)
        } else {
            tracing::info!(
                model = %self.model.model_id(),
                tools = summary.tool_calls.len(),
                finish_reason = summary.finish_reason.as_ref().map(FinishReason::as_str),
                prompt_tokens = summary.usage.map(|u| u.prompt_tokens),
                completion_tokens = summary.usage.map(|u| u.completion_tokens),
                "turn complete"
            );
            TurnOutcome::Completed(summary)
        }
    }

    fn fail_turn(&mut self, user: Message, summary: TurnSummary, error: AgentError) -> AgentError {
        tracing::error!(model = %self.model.model_id(), error = %error, "turn failed");

        if !summary.tool_calls.is_empty() {
            self.commit(user, &summary);
        }

        error
    }

    fn commit(&mut self, user: Message, summary: &TurnSummary) {
        self.history.push(user);

        if !summary.tool_calls.is_empty() {
            self.history.push(Message::assistant_with_tool_calls(
                summary.text.clone(),
                summary.tool_calls.clone(),
            ));
            self.history.extend(
                summary
                    .tool_results
                    .iter()
                    .map(|result| Message::tool(result.call_id.clone(), result.content())),
            );
        } else if !summary.text.is_empty() {
            self.history.push(Message::assistant(summary.text.clone()));
        }
    }
}
