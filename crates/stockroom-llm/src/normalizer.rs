//! Maps decoded chunks to [`StreamEvent`]s

use stockroom_config::ToolCallMode;

use crate::protocol::{ChatChunk, ToolCallDelta};
use crate::types::{FinishReason, StreamEvent, ToolCall, Usage};

/// Tool call being assembled from argument fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToolCall {
    /// Upstream id, or the function name when upstream sent none
    pub id: String,
    pub name: String,
    /// Position in the upstream `tool_calls` array; `None` for legacy calls
    pub index: Option<u32>,
    /// Concatenated argument fragments
    pub arguments: String,
}

impl PartialToolCall {
    fn open(fragment: &Fragment) -> Self {
        let name = fragment.name.clone().unwrap_or_default();
        let id = fragment
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| name.clone());

        Self {
            id,
            name,
            index: fragment.index,
            arguments: String::new(),
        }
    }

    fn is_superseded_by(&self, fragment: &Fragment) -> bool {
        let other_index = matches!((self.index, fragment.index), (Some(open), Some(next)) if open != next);
        let other_id = fragment
            .id
            .as_deref()
            .is_some_and(|id| !id.is_empty() && id != self.id);

        other_index || other_id
    }

    fn append(&mut self, fragment: Fragment) {
        if self.name.is_empty()
            && let Some(name) = fragment.name.filter(|n| !n.is_empty())
        {
            if self.id.is_empty() {
                self.id.clone_from(&name);
            }
            self.name = name;
        }

        if let Some(arguments) = fragment.arguments {
            self.arguments.push_str(&arguments);
        }
    }

    fn into_tool_call(self) -> ToolCall {
        ToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

/// A function-call fragment in either upstream format
#[derive(Debug, Default)]
struct Fragment {
    index: Option<u32>,
    id: Option<String>,
    name: Option<String>,
    arguments: Option<String>,
}

impl From<ToolCallDelta> for Fragment {
    fn from(delta: ToolCallDelta) -> Self {
        let function = delta.function.unwrap_or_default();
        Self {
            index: delta.index,
            id: delta.id,
            name: function.name,
            arguments: function.arguments,
        }
    }
}

/// Per-stream state turning chunks into events
///
/// Owns the last observed finish reason and usage plus the tool call under
/// assembly. One instance serves exactly one stream.
#[derive(Debug)]
pub struct Normalizer {
    mode: ToolCallMode,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    pending: Option<PartialToolCall>,
    finished: bool,
}

impl Normalizer {
    pub const fn new(mode: ToolCallMode) -> Self {
        Self {
            mode,
            finish_reason: None,
            usage: None,
            pending: None,
            finished: false,
        }
    }

    /// Events produced by one decoded chunk
    pub fn push(&mut self, chunk: ChatChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }

        if let Some(error) = &chunk.error {
            tracing::warn!(error = %error, "upstream reported an error inside the stream");
        }

        let choice = chunk.choices.into_iter().next();

        let mut saw_finish = false;
        if let Some(reason) = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| !r.is_empty())
        {
            self.finish_reason = Some(FinishReason::from(reason));
            saw_finish = true;
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into());
        }

        if let Some(delta) = choice.and_then(|c| c.delta) {
            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::TextDelta(text));
            }

            if let Some(call) = delta.function_call {
                self.on_fragment(
                    Fragment {
                        name: call.name,
                        arguments: call.arguments,
                        ..Fragment::default()
                    },
                    &mut events,
                );
            }

            for call in delta.tool_calls.into_iter().flatten() {
                self.on_fragment(call.into(), &mut events);
            }
        }

        if saw_finish {
            self.close_pending(&mut events);
        }

        events
    }

    /// Events produced by the termination sentinel
    ///
    /// Flushes any open tool call, then emits `Finish` when both a finish
    /// reason and usage were seen. Later calls return nothing.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }
        self.finished = true;

        self.close_pending(&mut events);

        match (self.finish_reason.clone(), self.usage) {
            (Some(reason), Some(usage)) => events.push(StreamEvent::Finish { reason, usage }),
            (reason, usage) => tracing::debug!(
                has_finish_reason = reason.is_some(),
                has_usage = usage.is_some(),
                "stream completed without a finish event"
            ),
        }

        events
    }

    /// Drop state after the body ended without the sentinel
    ///
    /// Returns the tool call that was being assembled, which is never emitted.
    pub fn abandon(&mut self) -> Option<PartialToolCall> {
        self.finished = true;
        self.pending.take()
    }

    pub const fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    pub const fn usage(&self) -> Option<Usage> {
        self.usage
    }

    pub const fn pending_tool_call(&self) -> Option<&PartialToolCall> {
        self.pending.as_ref()
    }

    fn on_fragment(&mut self, fragment: Fragment, events: &mut Vec<StreamEvent>) {
        match self.mode {
            ToolCallMode::PerFragment => {
                let mut call = PartialToolCall::open(&fragment);
                call.append(fragment);
                events.push(StreamEvent::ToolCall(call.into_tool_call()));
            }
            ToolCallMode::Accumulate => {
                if self.pending.as_ref().is_some_and(|open| open.is_superseded_by(&fragment)) {
                    self.close_pending(events);
                }

                self.pending
                    .get_or_insert_with(|| PartialToolCall::open(&fragment))
                    .append(fragment);
            }
        }
    }

    fn close_pending(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(call) = self.pending.take() {
            tracing::debug!(id = %call.id, name = %call.name, "tool call complete");
            events.push(StreamEvent::ToolCall(call.into_tool_call()));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn chunk(value: serde_json::Value) -> ChatChunk {
        serde_json::from_value(value).unwrap()
    }

    fn text(delta: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {"content": delta}}]}))
    }

    fn tool_fragment(index: u32, id: Option<&str>, name: Option<&str>, arguments: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": index,
            "id": id,
            "function": {"name": name, "arguments": arguments}
        }]}}]}))
    }

    fn usage(prompt: u32, completion: u32) -> ChatChunk {
        chunk(json!({"choices": [], "usage": {"prompt_tokens": prompt, "completion_tokens": completion}}))
    }

    fn stop(reason: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": reason}]}))
    }

    #[test]
    fn text_then_finish() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);

        assert_eq!(normalizer.push(text("Hel")), vec![StreamEvent::TextDelta("Hel".to_owned())]);
        assert_eq!(normalizer.push(text("lo")), vec![StreamEvent::TextDelta("lo".to_owned())]);
        assert!(normalizer.push(stop("stop")).is_empty());
        assert!(normalizer.push(usage(5, 2)).is_empty());

        assert_eq!(
            normalizer.finish(),
            vec![StreamEvent::Finish {
                reason: FinishReason::Stop,
                usage: Usage {
                    prompt_tokens: 5,
                    completion_tokens: 2
                },
            }]
        );
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn empty_content_emits_nothing() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        assert!(normalizer.push(text("")).is_empty());
    }

    #[test]
    fn no_finish_without_usage() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(stop("stop"));
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn no_finish_without_reason() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(usage(1, 1));
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn last_usage_and_reason_win() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(usage(1, 1));
        normalizer.push(stop("length"));
        normalizer.push(usage(9, 3));
        normalizer.push(stop("stop"));

        assert_eq!(normalizer.finish_reason(), Some(&FinishReason::Stop));
        assert_eq!(normalizer.usage().map(|u| u.prompt_tokens), Some(9));
    }

    #[test]
    fn usage_is_recorded_alongside_a_choice() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        let events = normalizer.push(chunk(json!({
            "choices": [{"index": 0, "delta": {"content": "hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 1}
        })));

        assert_eq!(events, vec![StreamEvent::TextDelta("hi".to_owned())]);
        assert_eq!(normalizer.finish().len(), 1);
    }

    #[test]
    fn fragments_accumulate_into_one_call() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);

        assert!(normalizer.push(tool_fragment(0, Some("call_1"), Some("search_images"), "{\"que")).is_empty());
        assert!(normalizer.push(tool_fragment(0, None, None, "ry\":\"ca")).is_empty());
        assert!(normalizer.push(tool_fragment(0, None, None, "ts\"}")).is_empty());
        assert_eq!(
            normalizer.pending_tool_call().map(|c| c.arguments.as_str()),
            Some("{\"query\":\"cats\"}")
        );

        let events = normalizer.push(stop("tool_calls"));
        assert_eq!(
            events,
            vec![StreamEvent::ToolCall(ToolCall {
                id: "call_1".to_owned(),
                name: "search_images".to_owned(),
                arguments: "{\"query\":\"cats\"}".to_owned(),
            })]
        );

        let call = match &events[0] {
            StreamEvent::ToolCall(call) => call.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        let arguments: serde_json::Value = call.parse_arguments().unwrap();
        assert_eq!(arguments, json!({"query": "cats"}));
    }

    #[test]
    fn new_index_closes_previous_call() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(tool_fragment(0, Some("call_a"), Some("show_images"), "{\"imageIDs\":[\"1\"]}"));

        let events = normalizer.push(tool_fragment(1, Some("call_b"), Some("show_history"), "{}"));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::ToolCall(call) if call.id == "call_a"));

        normalizer.push(stop("tool_calls"));
        normalizer.push(usage(1, 1));
        let events = normalizer.finish();
        assert!(matches!(&events[0], StreamEvent::Finish { reason: FinishReason::ToolCalls, .. }));
    }

    #[test]
    fn sentinel_flushes_open_call_before_finish() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(usage(2, 2));
        normalizer.push(chunk(json!({"choices": [{"index": 0, "finish_reason": "function_call", "delta": {}}]})));
        normalizer.push(tool_fragment(0, None, Some("show_history"), "{}"));

        let events = normalizer.finish();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::ToolCall(call) if call.id == "show_history"));
        assert!(matches!(&events[1], StreamEvent::Finish { reason: FinishReason::FunctionCall, .. }));
    }

    #[test]
    fn legacy_function_call_uses_name_as_id() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(chunk(json!({"choices": [{"delta": {"function_call": {"name": "search_images", "arguments": ""}}}]})));
        normalizer.push(chunk(json!({"choices": [{"delta": {"function_call": {"arguments": "{\"query\":\"dogs\"}"}}}]})));

        let events = normalizer.push(stop("function_call"));
        assert_eq!(
            events,
            vec![StreamEvent::ToolCall(ToolCall {
                id: "search_images".to_owned(),
                name: "search_images".to_owned(),
                arguments: "{\"query\":\"dogs\"}".to_owned(),
            })]
        );
    }

    #[test]
    fn per_fragment_mode_emits_each_fragment() {
        let mut normalizer = Normalizer::new(ToolCallMode::PerFragment);
        let first = normalizer.push(tool_fragment(0, Some("call_1"), Some("search_images"), "{\"query\""));
        let second = normalizer.push(tool_fragment(0, None, None, ":\"cats\"}"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(normalizer.pending_tool_call().is_none());
        assert!(matches!(&second[0], StreamEvent::ToolCall(call) if call.arguments == ":\"cats\"}"));
    }

    #[test]
    fn abandon_discards_open_call() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        normalizer.push(tool_fragment(0, Some("call_1"), Some("purchase_images"), "{\"ima"));

        let dropped = normalizer.abandon();
        assert_eq!(dropped.map(|c| c.arguments), Some("{\"ima".to_owned()));
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn mid_stream_error_object_is_ignored() {
        let mut normalizer = Normalizer::new(ToolCallMode::Accumulate);
        let events = normalizer.push(chunk(json!({"error": {"message": "provider overloaded", "code": 502}})));
        assert!(events.is_empty());
    }
}
