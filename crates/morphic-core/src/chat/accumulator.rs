//! Folds UI stream chunks into the assistant `UiMessage` that gets persisted.

use std::collections::HashMap;

use morphic_types::message::{MessagePart, MessageRole, ToolState, UiMessage};
use morphic_types::stream::UiChunk;

pub struct MessageAccumulator {
    message: UiMessage,
    /// Stream part id to index in `message.parts`.
    open_parts: HashMap<String, usize>,
}

impl MessageAccumulator {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message: UiMessage::new(message_id, MessageRole::Assistant, Vec::new()),
            open_parts: HashMap::new(),
        }
    }

    pub fn apply(&mut self, chunk: &UiChunk) {
        let parts = &mut self.message.parts;
        match chunk {
            UiChunk::Start {
                message_id,
                message_metadata,
            } => {
                if !message_id.is_empty() {
                    self.message.id = message_id.clone();
                }
                if message_metadata.is_some() {
                    self.message.metadata = message_metadata.clone();
                }
            }
            UiChunk::StartStep => parts.push(MessagePart::StepStart),
            UiChunk::TextStart { id } => {
                self.open_parts.insert(id.clone(), parts.len());
                parts.push(MessagePart::text(""));
            }
            UiChunk::ReasoningStart { id } => {
                self.open_parts.insert(id.clone(), parts.len());
                parts.push(MessagePart::Reasoning { text: String::new() });
            }
            UiChunk::TextDelta { id, delta } | UiChunk::ReasoningDelta { id, delta } => {
                let index = match self.open_parts.get(id) {
                    Some(&index) => index,
                    None => {
                        let index = parts.len();
                        self.open_parts.insert(id.clone(), index);
                        parts.push(if matches!(chunk, UiChunk::ReasoningDelta { .. }) {
                            MessagePart::Reasoning { text: String::new() }
                        } else {
                            MessagePart::text("")
                        });
                        index
                    }
                };
                if let Some(MessagePart::Text { text } | MessagePart::Reasoning { text }) =
                    parts.get_mut(index)
                {
                    text.push_str(delta);
                }
            }
            UiChunk::TextEnd { id } | UiChunk::ReasoningEnd { id } => {
                self.open_parts.remove(id);
            }
            UiChunk::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => parts.push(MessagePart::Tool {
                tool_name: tool_name.clone(),
                tool_call_id: tool_call_id.clone(),
                state: ToolState::InputAvailable,
                input: Some(input.clone()),
                output: None,
                error_text: None,
            }),
            UiChunk::ToolOutputAvailable {
                tool_call_id,
                output: result,
            } => {
                if let Some(MessagePart::Tool { state, output, .. }) = find_tool(parts, tool_call_id) {
                    *state = ToolState::OutputAvailable;
                    *output = Some(result.clone());
                }
            }
            UiChunk::ToolOutputError {
                tool_call_id,
                error_text: message,
            } => {
                if let Some(MessagePart::Tool {
                    state, error_text, ..
                }) = find_tool(parts, tool_call_id)
                {
                    *state = ToolState::OutputError;
                    *error_text = Some(message.clone());
                }
            }
            UiChunk::DataRelatedQuestions { id, data } => {
                let value = serde_json::to_value(data).unwrap_or_default();
                let existing = parts.iter_mut().find(|p| {
                    matches!(p, MessagePart::Data { name, id: Some(pid), .. } if name == "relatedQuestions" && pid == id)
                });
                match existing {
                    Some(MessagePart::Data { data, .. }) => *data = value,
                    _ => parts.push(MessagePart::Data {
                        name: "relatedQuestions".to_string(),
                        id: Some(id.clone()),
                        data: value,
                    }),
                }
            }
            UiChunk::Finish { message_metadata } => {
                if let Some(metadata) = message_metadata {
                    self.message.metadata = Some(metadata.clone());
                }
            }
            UiChunk::FinishStep | UiChunk::Error { .. } => {}
        }
    }

    pub fn message(&self) -> &UiMessage {
        &self.message
    }

    pub fn finish(self) -> UiMessage {
        self.message
    }
}

fn find_tool<'a>(parts: &'a mut [MessagePart], call_id: &str) -> Option<&'a mut MessagePart> {
    parts
        .iter_mut()
        .rev()
        .find(|p| matches!(p, MessagePart::Tool { tool_call_id, .. } if tool_call_id == call_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphic_types::message::MessageMetadata;
    use morphic_types::stream::{RelatedQuestion, RelatedQuestionsData, RelatedStatus};
    use serde_json::json;

    fn fold(chunks: Vec<UiChunk>) -> UiMessage {
        let mut acc = MessageAccumulator::new("m1");
        for chunk in &chunks {
            acc.apply(chunk);
        }
        acc.finish()
    }

    #[test]
    fn test_text_and_tool_parts() {
        let message = fold(vec![
            UiChunk::Start {
                message_id: "m2".into(),
                message_metadata: Some(MessageMetadata {
                    model_id: Some("openai:gpt-4o-mini".into()),
                    ..Default::default()
                }),
            },
            UiChunk::StartStep,
            UiChunk::ToolInputAvailable {
                tool_call_id: "c1".into(),
                tool_name: "search".into(),
                input: json!({"query": "rust"}),
            },
            UiChunk::ToolOutputAvailable {
                tool_call_id: "c1".into(),
                output: json!({"results": []}),
            },
            UiChunk::FinishStep,
            UiChunk::StartStep,
            UiChunk::TextStart { id: "t".into() },
            UiChunk::TextDelta {
                id: "t".into(),
                delta: "Hello ".into(),
            },
            UiChunk::TextDelta {
                id: "t".into(),
                delta: "world".into(),
            },
            UiChunk::TextEnd { id: "t".into() },
            UiChunk::FinishStep,
        ]);

        assert_eq!(message.id, "m2");
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), "Hello world");
        assert_eq!(message.parts.len(), 4);
        assert!(matches!(
            &message.parts[1],
            MessagePart::Tool { state: ToolState::OutputAvailable, output: Some(_), .. }
        ));
        assert_eq!(
            message.metadata.unwrap().model_id.as_deref(),
            Some("openai:gpt-4o-mini")
        );
    }

    #[test]
    fn test_tool_error_and_reasoning() {
        let message = fold(vec![
            UiChunk::ReasoningStart { id: "r".into() },
            UiChunk::ReasoningDelta {
                id: "r".into(),
                delta: "hmm".into(),
            },
            UiChunk::ReasoningEnd { id: "r".into() },
            UiChunk::ToolInputAvailable {
                tool_call_id: "c1".into(),
                tool_name: "fetch".into(),
                input: json!({"url": "https://x"}),
            },
            UiChunk::ToolOutputError {
                tool_call_id: "c1".into(),
                error_text: "timeout".into(),
            },
        ]);
        assert_eq!(message.parts[0], MessagePart::Reasoning { text: "hmm".into() });
        assert!(matches!(
            &message.parts[1],
            MessagePart::Tool { state: ToolState::OutputError, error_text: Some(e), .. } if e == "timeout"
        ));
    }

    #[test]
    fn test_related_questions_part_is_replaced_in_place() {
        let message = fold(vec![
            UiChunk::DataRelatedQuestions {
                id: "rq".into(),
                data: RelatedQuestionsData::with_status(RelatedStatus::Loading),
            },
            UiChunk::DataRelatedQuestions {
                id: "rq".into(),
                data: RelatedQuestionsData {
                    status: RelatedStatus::Success,
                    questions: Some(vec![RelatedQuestion {
                        question: "Why?".into(),
                    }]),
                },
            },
        ]);
        assert_eq!(message.parts.len(), 1);
        match &message.parts[0] {
            MessagePart::Data { name, data, .. } => {
                assert_eq!(name, "relatedQuestions");
                assert_eq!(data["status"], "success");
            }
            other => panic!("unexpected part {other:?}"),
        }
    }
}
