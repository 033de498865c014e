//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Tool call arguments arrive as partial JSON fragments across multiple
//! chunks, keyed by tool call index. They are accumulated and emitted as
//! [`StreamEvent::ToolUseComplete`] once a finish_reason arrives (or the
//! stream ends without one).

use std::collections::BTreeMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use morphic_core::llm::provider::LlmEventStream;
use morphic_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::StreamChunk;

/// Accumulates partial JSON fragments for a tool call during streaming.
#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

/// Per-stream state: pending tool calls and the `<think>` splitter.
pub(crate) struct OpenAiStreamState {
    tools: BTreeMap<u32, ToolCallAccumulator>,
    think: Option<ThinkTagSplitter>,
    finished: bool,
}

impl OpenAiStreamState {
    pub(crate) fn new(extract_think_tags: bool) -> Self {
        Self {
            tools: BTreeMap::new(),
            think: extract_think_tags.then(ThinkTagSplitter::default),
            finished: false,
        }
    }

    /// Translate one decoded chunk into zero or more events.
    pub(crate) fn handle_chunk(&mut self, chunk: StreamChunk) -> Result<Vec<StreamEvent>, LlmError> {
        let mut events = Vec::new();

        for choice in chunk.choices {
            let delta = choice.delta;

            if let Some(reasoning) = delta.reasoning_content
                && !reasoning.is_empty()
            {
                events.push(StreamEvent::ReasoningDelta { text: reasoning });
            }

            if let Some(text) = delta.content
                && !text.is_empty()
            {
                match self.think.as_mut() {
                    Some(splitter) => events.extend(splitter.push(&text)),
                    None => events.push(StreamEvent::TextDelta { text }),
                }
            }

            for tc in delta.tool_calls {
                let acc = self.tools.entry(tc.index).or_default();
                if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                    acc.id = id;
                }
                if let Some(function) = tc.function {
                    if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                        acc.name = name;
                    }
                    if let Some(args) = function.arguments {
                        acc.json_buffer.push_str(&args);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                events.extend(self.flush_text());
                let had_tools = !self.tools.is_empty();
                events.extend(self.flush_tools()?);

                let mut stop_reason = reason.parse::<StopReason>().unwrap_or(StopReason::EndTurn);
                // Gemini reports "stop" even when the turn ends in tool calls.
                if had_tools && stop_reason == StopReason::EndTurn {
                    stop_reason = StopReason::ToolUse;
                }
                events.push(StreamEvent::MessageDelta { stop_reason });
                self.finished = true;
            }
        }

        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage(Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            }));
        }

        Ok(events)
    }

    /// Events still owed when the stream closes.
    pub(crate) fn finish(&mut self) -> Result<Vec<StreamEvent>, LlmError> {
        let mut events = self.flush_text();
        let had_tools = !self.tools.is_empty();
        events.extend(self.flush_tools()?);
        if !self.finished {
            let stop_reason = if had_tools { StopReason::ToolUse } else { StopReason::EndTurn };
            events.push(StreamEvent::MessageDelta { stop_reason });
            self.finished = true;
        }
        Ok(events)
    }

    fn flush_text(&mut self) -> Vec<StreamEvent> {
        self.think.as_mut().map(ThinkTagSplitter::flush).unwrap_or_default()
    }

    fn flush_tools(&mut self) -> Result<Vec<StreamEvent>, LlmError> {
        std::mem::take(&mut self.tools)
            .into_values()
            .map(|acc| -> Result<StreamEvent, LlmError> {
                let input = if acc.json_buffer.trim().is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&acc.json_buffer).map_err(|e| {
                        LlmError::Deserialization(format!("tool call JSON for '{}': {e}", acc.name))
                    })?
                };
                Ok(StreamEvent::ToolUseComplete {
                    id: acc.id,
                    name: acc.name,
                    input,
                })
            })
            .collect()
    }
}

/// Map an OpenAI-style SSE response body to a stream of [`StreamEvent`]s.
///
/// Emits `Connected` first and `Done` last. Usage arrives in the final
/// chunk when `stream_options.include_usage` was requested.
pub(crate) fn map_openai_stream(response: reqwest::Response, extract_think_tags: bool) -> LlmEventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut state = OpenAiStreamState::new(extract_think_tags);
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                break;
            }

            let chunk: StreamChunk = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("stream chunk: {e}")))?;
            for out in state.handle_chunk(chunk)? {
                yield out;
            }
        }

        for out in state.finish()? {
            yield out;
        }
        yield StreamEvent::Done;
    })
}

// ---------------------------------------------------------------------------
// <think> tag splitting
// ---------------------------------------------------------------------------

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Splits inline `<think>...</think>` spans into reasoning deltas. Tags may
/// straddle chunk boundaries, so a possible partial tag is held back.
#[derive(Default)]
struct ThinkTagSplitter {
    in_think: bool,
    pending: String,
}

impl ThinkTagSplitter {
    fn push(&mut self, text: &str) -> Vec<StreamEvent> {
        self.pending.push_str(text);
        let mut events = Vec::new();

        loop {
            let tag = if self.in_think { THINK_CLOSE } else { THINK_OPEN };
            if let Some(pos) = self.pending.find(tag) {
                let before: String = self.pending[..pos].to_string();
                self.pending.drain(..pos + tag.len());
                self.emit(&mut events, before);
                self.in_think = !self.in_think;
                continue;
            }

            let keep = partial_suffix_len(&self.pending, tag);
            let ready: String = self.pending[..self.pending.len() - keep].to_string();
            self.pending.drain(..self.pending.len() - keep);
            self.emit(&mut events, ready);
            break;
        }

        events
    }

    fn flush(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let rest = std::mem::take(&mut self.pending);
        self.emit(&mut events, rest);
        events
    }

    fn emit(&self, events: &mut Vec<StreamEvent>, text: String) {
        if text.is_empty() {
            return;
        }
        events.push(if self.in_think {
            StreamEvent::ReasoningDelta { text }
        } else {
            StreamEvent::TextDelta { text }
        });
    }
}

/// Length of the longest suffix of `buf` that is a proper prefix of `tag`.
fn partial_suffix_len(buf: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| buf.ends_with(&tag[..n]))
        .unwrap_or(0)
}
