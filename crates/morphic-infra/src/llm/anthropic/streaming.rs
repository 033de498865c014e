//! SSE state machine for the Anthropic Messages API.
//!
//! Protocol:
//! 1. `message_start` carries the message object with initial usage
//! 2. Per block: `content_block_start`, N x `content_block_delta`, `content_block_stop`
//! 3. `message_delta` carries stop_reason and cumulative output usage
//! 4. `message_stop` ends the message
//! 5. `ping` keepalives and `error` events may appear anywhere
//!
//! Tool use input arrives as partial JSON fragments via `input_json_delta`.
//! These are accumulated per content block index and parsed only after
//! `content_block_stop`.

use std::collections::HashMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use morphic_core::llm::provider::LlmEventStream;
use morphic_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{
    AnthropicContentBlock, AnthropicDelta, ContentBlockDeltaPayload, ContentBlockStartPayload,
    ContentBlockStopPayload, ErrorPayload, MessageDeltaPayload, MessageStartPayload,
};

enum BlockState {
    Text,
    Thinking,
    ToolUse { id: String, name: String, json: String },
    Ignored,
}

/// Tracks open content blocks and usage across one streamed message.
#[derive(Default)]
pub(crate) struct AnthropicStreamState {
    blocks: HashMap<u32, BlockState>,
    input_tokens: u32,
    stopped: bool,
}

impl AnthropicStreamState {
    /// Whether `message_stop` has been seen.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Translate one named SSE event into zero or more [`StreamEvent`]s.
    pub(crate) fn handle(&mut self, event: &str, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
        let mut out = Vec::new();

        match event {
            "message_start" => {
                let payload: MessageStartPayload = decode(data)?;
                tracing::trace!(id = %payload.message.id, model = %payload.message.model, "anthropic message started");
                self.input_tokens = payload.message.usage.map(|u| u.input_tokens).unwrap_or(0);
            }
            "content_block_start" => {
                let payload: ContentBlockStartPayload = decode(data)?;
                let state = match payload.content_block {
                    AnthropicContentBlock::Text { text } => {
                        if !text.is_empty() {
                            out.push(StreamEvent::TextDelta { text });
                        }
                        BlockState::Text
                    }
                    AnthropicContentBlock::Thinking { thinking } => {
                        if !thinking.is_empty() {
                            out.push(StreamEvent::ReasoningDelta { text: thinking });
                        }
                        BlockState::Thinking
                    }
                    AnthropicContentBlock::ToolUse { id, name, .. } => BlockState::ToolUse {
                        id,
                        name,
                        json: String::new(),
                    },
                    AnthropicContentBlock::Unknown => BlockState::Ignored,
                };
                self.blocks.insert(payload.index, state);
            }
            "content_block_delta" => {
                let payload: ContentBlockDeltaPayload = decode(data)?;
                match (payload.delta, self.blocks.get_mut(&payload.index)) {
                    (AnthropicDelta::TextDelta { text }, _) => {
                        out.push(StreamEvent::TextDelta { text });
                    }
                    (AnthropicDelta::ThinkingDelta { thinking }, _) => {
                        out.push(StreamEvent::ReasoningDelta { text: thinking });
                    }
                    (AnthropicDelta::InputJsonDelta { partial_json }, Some(BlockState::ToolUse { json, .. })) => {
                        json.push_str(&partial_json);
                    }
                    (AnthropicDelta::InputJsonDelta { .. }, _) => {
                        tracing::warn!(index = payload.index, "input_json_delta for a non tool_use block");
                    }
                    (AnthropicDelta::SignatureDelta { .. } | AnthropicDelta::Unknown, _) => {}
                }
            }
            "content_block_stop" => {
                let payload: ContentBlockStopPayload = decode(data)?;
                if let Some(BlockState::ToolUse { id, name, json }) = self.blocks.remove(&payload.index) {
                    let input = if json.trim().is_empty() {
                        serde_json::Value::Object(Default::default())
                    } else {
                        serde_json::from_str(&json).map_err(|e| {
                            LlmError::Deserialization(format!("tool input JSON for '{name}': {e}"))
                        })?
                    };
                    out.push(StreamEvent::ToolUseComplete { id, name, input });
                }
            }
            "message_delta" => {
                let payload: MessageDeltaPayload = decode(data)?;
                if let Some(reason) = payload.delta.stop_reason {
                    let stop_reason = reason.parse::<StopReason>().unwrap_or(StopReason::EndTurn);
                    out.push(StreamEvent::MessageDelta { stop_reason });
                }
                out.push(StreamEvent::Usage(Usage {
                    input_tokens: self.input_tokens.max(payload.usage.input_tokens),
                    output_tokens: payload.usage.output_tokens,
                }));
            }
            "message_stop" => {
                self.stopped = true;
            }
            "ping" => {}
            "error" => {
                let payload: ErrorPayload = decode(data)?;
                return Err(match payload.error.error_type.as_str() {
                    "overloaded_error" => LlmError::Overloaded(payload.error.message),
                    "rate_limit_error" => LlmError::RateLimited { retry_after_ms: None },
                    "authentication_error" => LlmError::AuthenticationFailed,
                    "invalid_request_error" => LlmError::InvalidRequest(payload.error.message),
                    _ => LlmError::Provider {
                        message: payload.error.message,
                    },
                });
            }
            other => {
                tracing::debug!(event = other, "ignoring unknown anthropic SSE event");
            }
        }

        Ok(out)
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, LlmError> {
    serde_json::from_str(data).map_err(|e| LlmError::Deserialization(format!("anthropic SSE payload: {e}")))
}

/// Map an Anthropic SSE response body to a stream of [`StreamEvent`]s,
/// bracketed by `Connected` and `Done`.
pub(crate) fn map_anthropic_stream(response: reqwest::Response) -> LlmEventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut state = AnthropicStreamState::default();
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            for out in state.handle(&event.event, &event.data)? {
                yield out;
            }
            if state.is_stopped() {
                break;
            }
        }

        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[(&str, &str)]) -> Result<Vec<StreamEvent>, LlmError> {
        let mut state = AnthropicStreamState::default();
        let mut out = Vec::new();
        for (name, data) in events {
            out.extend(state.handle(name, data)?);
        }
        Ok(out)
    }

    #[test]
    fn test_text_stream() {
        let events = run(&[
            ("message_start", r#"{"message":{"id":"msg_1","model":"claude","usage":{"input_tokens":25}}}"#),
            ("content_block_start", r#"{"index":0,"content_block":{"type":"text","text":""}}"#),
            ("ping", "{}"),
            ("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":"Hi"}}"#),
            ("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":" there"}}"#),
            ("content_block_stop", r#"{"index":0}"#),
            ("message_delta", r#"{"delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":4}}"#),
            ("message_stop", "{}"),
        ])
        .unwrap();

        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::TextDelta { text } if text == "Hi"));
        assert!(matches!(
            events[2],
            StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn }
        ));
        assert!(matches!(
            events[3],
            StreamEvent::Usage(Usage { input_tokens: 25, output_tokens: 4 })
        ));
    }

    #[test]
    fn test_tool_use_accumulates_partial_json() {
        let events = run(&[
            ("content_block_start", r#"{"index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"search","input":{}}}"#),
            ("content_block_delta", r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"{\"query\":"}}"#),
            ("content_block_delta", r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"\"rust\"}"}}"#),
            ("content_block_stop", r#"{"index":1}"#),
            ("message_delta", r#"{"delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":9}}"#),
        ])
        .unwrap();

        match &events[0] {
            StreamEvent::ToolUseComplete { id, name, input } => {
                assert_eq!(id, "toolu_1");
                assert_eq!(name, "search");
                assert_eq!(input["query"], "rust");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            events[1],
            StreamEvent::MessageDelta { stop_reason: StopReason::ToolUse }
        ));
    }

    #[test]
    fn test_tool_use_without_input_is_empty_object() {
        let events = run(&[
            ("content_block_start", r#"{"index":0,"content_block":{"type":"tool_use","id":"t","name":"todoRead","input":{}}}"#),
            ("content_block_stop", r#"{"index":0}"#),
        ])
        .unwrap();
        match &events[0] {
            StreamEvent::ToolUseComplete { input, .. } => assert_eq!(input, &serde_json::json!({})),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_thinking_deltas_become_reasoning() {
        let events = run(&[
            ("content_block_start", r#"{"index":0,"content_block":{"type":"thinking","thinking":""}}"#),
            ("content_block_delta", r#"{"index":0,"delta":{"type":"thinking_delta","thinking":"Let me"}}"#),
            ("content_block_delta", r#"{"index":0,"delta":{"type":"signature_delta","signature":"sig"}}"#),
            ("content_block_stop", r#"{"index":0}"#),
        ])
        .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::ReasoningDelta { text } if text == "Let me"));
    }

    #[test]
    fn test_error_event_maps_overloaded() {
        let err = run(&[(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )])
        .unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(msg) if msg == "Overloaded"));
    }

    #[test]
    fn test_message_stop_marks_stopped() {
        let mut state = AnthropicStreamState::default();
        assert!(!state.is_stopped());
        state.handle("message_stop", "{}").unwrap();
        assert!(state.is_stopped());
    }
}
