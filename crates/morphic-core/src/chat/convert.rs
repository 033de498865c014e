//! Conversion of UI messages into provider-agnostic model messages.
//!
//! An assistant UI message can span several agent steps. Each step becomes
//! one assistant message carrying its text and tool calls, followed by one
//! tool message per call that has a result. Tool calls still waiting for a
//! result are dropped, since providers reject calls without results.

use morphic_types::llm::{Message, MessageRole, ToolCall};
use morphic_types::message::{MessagePart, ToolState, UiMessage};

pub fn to_model_messages(messages: &[UiMessage]) -> Vec<Message> {
    let mut out = Vec::new();
    for message in messages {
        match message.role {
            MessageRole::Assistant => convert_assistant(message, &mut out),
            MessageRole::System => {
                let text = message.text();
                if !text.is_empty() {
                    out.push(Message {
                        role: MessageRole::System,
                        content: text,
                        tool_calls: vec![],
                        tool_call_id: None,
                    });
                }
            }
            _ => out.push(Message::user(user_content(message))),
        }
    }
    out
}

fn user_content(message: &UiMessage) -> String {
    let mut pieces = Vec::new();
    for part in &message.parts {
        match part {
            MessagePart::Text { text } => pieces.push(text.clone()),
            MessagePart::File { filename, url, .. } => pieces.push(format!("[{filename}]({url})")),
            _ => {}
        }
    }
    pieces.join("\n")
}

#[derive(Default)]
struct Step {
    text: String,
    calls: Vec<ToolCall>,
    results: Vec<Message>,
}

impl Step {
    fn flush(&mut self, out: &mut Vec<Message>) {
        let step = std::mem::take(self);
        if step.text.is_empty() && step.calls.is_empty() {
            return;
        }
        out.push(Message::assistant_with_tools(step.text, step.calls));
        out.extend(step.results);
    }
}

fn convert_assistant(message: &UiMessage, out: &mut Vec<Message>) {
    let mut step = Step::default();
    for part in &message.parts {
        match part {
            MessagePart::StepStart => step.flush(out),
            MessagePart::Text { text } => step.text.push_str(text),
            MessagePart::Tool {
                tool_name,
                tool_call_id,
                state,
                input,
                output,
                error_text,
            } => {
                let result = match state {
                    ToolState::OutputAvailable => output.as_ref().map(|o| o.to_string()),
                    ToolState::OutputError => {
                        Some(error_text.clone().unwrap_or_else(|| "tool execution failed".to_string()))
                    }
                    _ => None,
                };
                let Some(result) = result else {
                    continue;
                };
                step.calls.push(ToolCall {
                    id: tool_call_id.clone(),
                    name: tool_name.clone(),
                    input: input.clone().unwrap_or(serde_json::Value::Null),
                });
                step.results.push(Message::tool_result(tool_call_id.clone(), result));
            }
            _ => {}
        }
    }
    step.flush(out);
}

/// Remove tool calls and tool results from all but the last `keep_last`
/// messages, then drop messages left empty.
pub fn prune_tool_calls(messages: Vec<Message>, keep_last: usize) -> Vec<Message> {
    let boundary = messages.len().saturating_sub(keep_last);
    messages
        .into_iter()
        .enumerate()
        .filter_map(|(i, mut m)| {
            if i < boundary {
                if m.role == MessageRole::Tool {
                    return None;
                }
                m.tool_calls.clear();
            }
            (!m.content.is_empty() || !m.tool_calls.is_empty()).then_some(m)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_part(id: &str, state: ToolState, output: Option<serde_json::Value>) -> MessagePart {
        MessagePart::Tool {
            tool_name: "search".into(),
            tool_call_id: id.into(),
            state,
            input: Some(json!({"query": "rust"})),
            output,
            error_text: None,
        }
    }

    #[test]
    fn user_message_joins_text() {
        let msg = UiMessage::new(
            "u1",
            MessageRole::User,
            vec![MessagePart::text("hello"), MessagePart::text("world")],
        );
        let out = to_model_messages(&[msg]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "hello\nworld");
    }

    #[test]
    fn assistant_steps_become_call_and_result_messages() {
        let msg = UiMessage::new(
            "a1",
            MessageRole::Assistant,
            vec![
                MessagePart::StepStart,
                tool_part("call_1", ToolState::OutputAvailable, Some(json!({"results": []}))),
                MessagePart::StepStart,
                MessagePart::text("The answer [1](#call_1)."),
            ],
        );
        let out = to_model_messages(&[msg]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].role, MessageRole::Assistant);
        assert_eq!(out[0].tool_calls[0].id, "call_1");
        assert_eq!(out[1].role, MessageRole::Tool);
        assert_eq!(out[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(out[2].content, "The answer [1](#call_1).");
    }

    #[test]
    fn pending_tool_calls_are_dropped() {
        let msg = UiMessage::new(
            "a1",
            MessageRole::Assistant,
            vec![tool_part("call_q", ToolState::InputAvailable, None)],
        );
        assert!(to_model_messages(&[msg]).is_empty());
    }

    #[test]
    fn prune_keeps_recent_tool_traffic() {
        let messages = vec![
            Message::user("q1"),
            Message::assistant_with_tools("", vec![ToolCall { id: "c1".into(), name: "search".into(), input: json!({}) }]),
            Message::tool_result("c1", "{}"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant_with_tools("", vec![ToolCall { id: "c2".into(), name: "search".into(), input: json!({}) }]),
            Message::tool_result("c2", "{}"),
        ];
        let pruned = prune_tool_calls(messages, 2);
        let roles: Vec<_> = pruned.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool
            ]
        );
        assert_eq!(pruned[1].content, "a1");
    }
}
