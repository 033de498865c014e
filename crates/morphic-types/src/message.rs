//! UI message types for Morphic.
//!
//! A `UiMessage` is what the browser renders and what gets persisted: an
//! ordered list of typed parts (text, reasoning, files, sources, tool
//! invocations with their results, and free-form data parts such as related
//! questions). On the wire a part is a flat JSON object whose `type` field
//! carries the variant, with tool and data parts using dynamic type names
//! (`tool-search`, `data-relatedQuestions`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::llm::MessageRole;
use crate::model::SearchMode;

/// Lifecycle state of a tool part.
///
/// Maps to the CHECK constraint on `parts.tool_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolState::InputStreaming => write!(f, "input-streaming"),
            ToolState::InputAvailable => write!(f, "input-available"),
            ToolState::OutputAvailable => write!(f, "output-available"),
            ToolState::OutputError => write!(f, "output-error"),
        }
    }
}

impl FromStr for ToolState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input-streaming" => Ok(ToolState::InputStreaming),
            "input-available" => Ok(ToolState::InputAvailable),
            "output-available" => Ok(ToolState::OutputAvailable),
            "output-error" => Ok(ToolState::OutputError),
            other => Err(format!("invalid tool state: '{other}'")),
        }
    }
}

/// One renderable piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPart", into = "RawPart")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    File {
        media_type: String,
        filename: String,
        url: String,
    },
    SourceUrl {
        source_id: String,
        url: String,
        title: Option<String>,
    },
    /// Boundary between agent steps.
    StepStart,
    Tool {
        tool_name: String,
        tool_call_id: String,
        state: ToolState,
        input: Option<serde_json::Value>,
        output: Option<serde_json::Value>,
        error_text: Option<String>,
    },
    Data {
        name: String,
        id: Option<String>,
        data: serde_json::Value,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }

    /// The wire `type` of this part (e.g. `text`, `tool-search`).
    pub fn type_name(&self) -> String {
        match self {
            MessagePart::Text { .. } => "text".to_string(),
            MessagePart::Reasoning { .. } => "reasoning".to_string(),
            MessagePart::File { .. } => "file".to_string(),
            MessagePart::SourceUrl { .. } => "source-url".to_string(),
            MessagePart::StepStart => "step-start".to_string(),
            MessagePart::Tool { tool_name, .. } => format!("tool-{tool_name}"),
            MessagePart::Data { name, .. } => format!("data-{name}"),
        }
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self, MessagePart::Reasoning { .. })
    }
}

/// Flat wire representation of a part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<ToolState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn required<T>(value: Option<T>, kind: &str, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("part '{kind}' is missing '{field}'"))
}

impl TryFrom<RawPart> for MessagePart {
    type Error = String;

    fn try_from(raw: RawPart) -> Result<Self, Self::Error> {
        let kind = raw.kind.as_str();
        match kind {
            "text" => Ok(MessagePart::Text {
                text: required(raw.text, kind, "text")?,
            }),
            "reasoning" => Ok(MessagePart::Reasoning {
                text: raw.text.unwrap_or_default(),
            }),
            "file" => Ok(MessagePart::File {
                media_type: required(raw.media_type, kind, "mediaType")?,
                filename: raw.filename.unwrap_or_else(|| "file".to_string()),
                url: required(raw.url, kind, "url")?,
            }),
            "source-url" => Ok(MessagePart::SourceUrl {
                source_id: required(raw.source_id, kind, "sourceId")?,
                url: required(raw.url, kind, "url")?,
                title: raw.title,
            }),
            "step-start" => Ok(MessagePart::StepStart),
            _ if kind.starts_with("tool-") => Ok(MessagePart::Tool {
                tool_name: kind["tool-".len()..].to_string(),
                tool_call_id: required(raw.tool_call_id, kind, "toolCallId")?,
                state: required(raw.state, kind, "state")?,
                input: raw.input,
                output: raw.output,
                error_text: raw.error_text,
            }),
            _ if kind.starts_with("data-") => Ok(MessagePart::Data {
                name: kind["data-".len()..].to_string(),
                id: raw.id,
                data: raw.data.unwrap_or(serde_json::Value::Null),
            }),
            other => Err(format!("unknown part type: '{other}'")),
        }
    }
}

impl From<MessagePart> for RawPart {
    fn from(part: MessagePart) -> Self {
        let kind = part.type_name();
        match part {
            MessagePart::Text { text } | MessagePart::Reasoning { text } => RawPart {
                kind,
                text: Some(text),
                ..Default::default()
            },
            MessagePart::File {
                media_type,
                filename,
                url,
            } => RawPart {
                kind,
                media_type: Some(media_type),
                filename: Some(filename),
                url: Some(url),
                ..Default::default()
            },
            MessagePart::SourceUrl {
                source_id,
                url,
                title,
            } => RawPart {
                kind,
                source_id: Some(source_id),
                url: Some(url),
                title,
                ..Default::default()
            },
            MessagePart::StepStart => RawPart {
                kind,
                ..Default::default()
            },
            MessagePart::Tool {
                tool_call_id,
                state,
                input,
                output,
                error_text,
                ..
            } => RawPart {
                kind,
                tool_call_id: Some(tool_call_id),
                state: Some(state),
                input,
                output,
                error_text,
                ..Default::default()
            },
            MessagePart::Data { id, data, .. } => RawPart {
                kind,
                id,
                data: Some(data),
                ..Default::default()
            },
        }
    }
}

/// Metadata attached to persisted messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<SearchMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// 1 (good) or -1 (bad).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_score: Option<i8>,
}

/// A chat message as exchanged with the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl UiMessage {
    pub fn new(id: impl Into<String>, role: MessageRole, parts: Vec<MessagePart>) -> Self {
        Self {
            id: id.into(),
            role,
            parts,
            metadata: None,
        }
    }

    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, MessageRole::User, vec![MessagePart::text(text)])
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_part_uses_dynamic_type_name() {
        let part = MessagePart::Tool {
            tool_name: "search".into(),
            tool_call_id: "call_1".into(),
            state: ToolState::OutputAvailable,
            input: Some(json!({"query": "rust"})),
            output: None,
            error_text: None,
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool-search");
        assert_eq!(value["toolCallId"], "call_1");
        assert_eq!(value["state"], "output-available");
        assert!(value.get("output").is_none());
    }

    #[test]
    fn test_data_part_parses_name_from_type() {
        let value = json!({"type": "data-relatedQuestions", "id": "rq", "data": {"status": "loading"}});
        let part: MessagePart = serde_json::from_value(value).unwrap();
        match part {
            MessagePart::Data { name, id, data } => {
                assert_eq!(name, "relatedQuestions");
                assert_eq!(id.as_deref(), Some("rq"));
                assert_eq!(data["status"], "loading");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn test_text_part_requires_text() {
        let result: Result<MessagePart, _> = serde_json::from_value(json!({"type": "text"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_part_type_rejected() {
        let result: Result<MessagePart, _> = serde_json::from_value(json!({"type": "hologram"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_ui_message_from_client_json() {
        let value = json!({
            "id": "m1",
            "role": "user",
            "parts": [{"type": "text", "text": "What is Rust?"}, {"type": "step-start"}]
        });
        let msg: UiMessage = serde_json::from_value(value).unwrap();
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.parts.len(), 2);
        assert_eq!(msg.text(), "What is Rust?");
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_metadata_camel_case() {
        let meta = MessageMetadata {
            trace_id: Some("t1".into()),
            search_mode: Some(SearchMode::Quick),
            model_id: Some("openai:gpt-5-nano".into()),
            feedback_score: None,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({"traceId": "t1", "searchMode": "quick", "modelId": "openai:gpt-5-nano"}));
    }

    #[test]
    fn test_tool_state_display_matches_serde() {
        for state in [
            ToolState::InputStreaming,
            ToolState::InputAvailable,
            ToolState::OutputAvailable,
            ToolState::OutputError,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
            assert_eq!(state.to_string().parse::<ToolState>().unwrap(), state);
        }
    }
}
