//! UI message stream chunks.
//!
//! The chat endpoint answers with Server-Sent Events whose `data:` lines are
//! JSON chunks tagged by `type`. A client folds the chunks into a
//! `UiMessage` as they arrive.

use serde::{Deserialize, Serialize};

use crate::message::MessageMetadata;

/// Progress of the related-questions data part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedStatus {
    Loading,
    Streaming,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedQuestion {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedQuestionsData {
    pub status: RelatedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<RelatedQuestion>>,
}

impl RelatedQuestionsData {
    pub fn with_status(status: RelatedStatus) -> Self {
        Self {
            status,
            questions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UiChunk {
    Start {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_metadata: Option<MessageMetadata>,
    },
    StartStep,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: serde_json::Value,
    },
    ToolOutputAvailable {
        tool_call_id: String,
        output: serde_json::Value,
    },
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },
    #[serde(rename = "data-relatedQuestions")]
    DataRelatedQuestions {
        id: String,
        data: RelatedQuestionsData,
    },
    FinishStep,
    Finish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_metadata: Option<MessageMetadata>,
    },
    Error {
        error_text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_delta_wire_shape() {
        let chunk = UiChunk::TextDelta {
            id: "t1".into(),
            delta: "Hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            json!({"type": "text-delta", "id": "t1", "delta": "Hello"})
        );
    }

    #[test]
    fn test_tool_output_error_wire_shape() {
        let chunk = UiChunk::ToolOutputError {
            tool_call_id: "call_1".into(),
            error_text: "timeout".into(),
        };
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            json!({"type": "tool-output-error", "toolCallId": "call_1", "errorText": "timeout"})
        );
    }

    #[test]
    fn test_related_questions_wire_shape() {
        let chunk = UiChunk::DataRelatedQuestions {
            id: "rq".into(),
            data: RelatedQuestionsData {
                status: RelatedStatus::Success,
                questions: Some(vec![RelatedQuestion {
                    question: "Why?".into(),
                }]),
            },
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["type"], "data-relatedQuestions");
        assert_eq!(value["data"]["status"], "success");
        assert_eq!(value["data"]["questions"][0]["question"], "Why?");
    }

    #[test]
    fn test_unit_variants() {
        assert_eq!(
            serde_json::to_value(UiChunk::StartStep).unwrap(),
            json!({"type": "start-step"})
        );
        assert_eq!(
            serde_json::to_value(UiChunk::Finish { message_metadata: None }).unwrap(),
            json!({"type": "finish"})
        );
    }
}
