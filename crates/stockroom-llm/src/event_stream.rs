//! Drives a response body through the decoder and normalizer

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use stockroom_config::{LlmConfig, ToolCallMode, TruncationPolicy};

use crate::decoder::{DONE_SENTINEL, Line, LineBuffer, decode_line};
use crate::error::LlmError;
use crate::normalizer::Normalizer;
use crate::types::StreamEvent;

/// Normalized events from one streamed completion
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Knobs for turning a body into events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSettings {
    pub tool_calls: ToolCallMode,
    pub truncation: TruncationPolicy,
}

impl From<&LlmConfig> for StreamSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            tool_calls: config.tool_calls,
            truncation: config.truncation,
        }
    }
}

type ByteStream<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

struct State<E> {
    body: ByteStream<E>,
    lines: LineBuffer,
    normalizer: Normalizer,
    queue: VecDeque<Result<StreamEvent, LlmError>>,
    truncation: TruncationPolicy,
    done: bool,
}

impl<E: Display> State<E> {
    fn consume(&mut self, bytes: &[u8]) {
        for line in self.lines.push(bytes) {
            match decode_line(&line) {
                Line::Blank => {}
                Line::Done => {
                    self.queue.extend(self.normalizer.finish().into_iter().map(Ok));
                    self.done = true;
                    return;
                }
                Line::Chunk(chunk) => self.queue.extend(self.normalizer.push(chunk).into_iter().map(Ok)),
                Line::Skipped(error) => tracing::warn!(error = %error, line = %line, "skipping undecodable stream line"),
            }
        }
    }

    fn end_of_body(&mut self) {
        self.done = true;

        let pending_bytes = self.lines.pending_len();
        if pending_bytes > 0 {
            tracing::debug!(pending_bytes, "dropping unterminated final line");
        }

        if let Some(call) = self.normalizer.abandon() {
            tracing::warn!(id = %call.id, name = %call.name, "discarding incomplete tool call");
        }

        // the sentinel arrived, just without its newline
        if self.lines.pending_line().trim() == DONE_SENTINEL {
            tracing::debug!("stream ended on an unterminated [DONE] line");
            return;
        }

        match self.truncation {
            TruncationPolicy::Error => {
                tracing::error!(pending_bytes, "stream ended before the [DONE] sentinel");
                self.queue.push_back(Err(LlmError::TruncatedStream { pending_bytes }));
            }
            TruncationPolicy::Drop => {
                tracing::warn!(pending_bytes, "stream ended before the [DONE] sentinel");
            }
        }
    }

    fn read_failed(&mut self, error: &E) {
        self.done = true;
        self.normalizer.abandon();
        tracing::error!(error = %error, "failed to read stream body");
        self.queue
            .push_back(Err(LlmError::transport(format!("stream read failed: {error}"))));
    }
}

/// Turn a raw body into normalized events
///
/// Reading stops at the `[DONE]` sentinel; the body is dropped with the
/// returned stream. A read error yields one error item and ends the stream.
pub fn decode_event_stream<S, E>(body: S, settings: StreamSettings) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = State {
        body: Box::pin(body),
        lines: LineBuffer::new(),
        normalizer: Normalizer::new(settings.tool_calls),
        queue: VecDeque::new(),
        truncation: settings.truncation,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some((item, state));
            }

            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.consume(&bytes),
                Some(Err(error)) => state.read_failed(&error),
                None => state.end_of_body(),
            }
        }
    }))
}
