//! Follow-up question generation, streamed as a `data-relatedQuestions` part.
//!
//! The model is forced to call a `relatedQuestions` tool so the questions
//! arrive as structured input instead of free text. The part goes through
//! `loading`, one `streaming` update per question, then `success` (or
//! `error` when the model fails).

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

use morphic_types::llm::{CompletionRequest, Message, MessageRole, ToolChoice, ToolDefinition};
use morphic_types::stream::{RelatedQuestion, RelatedQuestionsData, RelatedStatus, UiChunk};

use super::tools::schema_of;
use crate::llm::box_provider::BoxLlmProvider;

const RELATED_SYSTEM_PROMPT: &str = r#"You are a professional web researcher generating follow-up questions. From the conversation and its search results, write 3 concise related questions that:

1. Explore aspects the original query did not cover
2. Dig into specific details from the search results
3. Connect to related topics or implications

Guidelines:
- Keep each question short (10-12 words at most)
- Never repeat or rephrase the original question
- Give each question its own angle
- Be specific and use plain language

Generate 3 unique follow-up questions by calling the relatedQuestions tool."#;

const TOOL_NAME: &str = "relatedQuestions";
const QUESTION_COUNT: usize = 3;

#[derive(Debug, Deserialize, JsonSchema)]
struct RelatedQuestionsInput {
    /// Exactly three follow-up questions
    questions: Vec<RelatedQuestionInput>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RelatedQuestionInput {
    /// A short follow-up question
    question: String,
}

fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Generate 3 unique follow-up questions that explore different aspects of \
                      the topic, avoiding repetition of the original query"
            .to_string(),
        input_schema: schema_of::<RelatedQuestionsInput>(),
    }
}

/// Ask the model for follow-up questions.
pub async fn generate_related_questions(
    provider: &BoxLlmProvider,
    model: &str,
    messages: Vec<Message>,
) -> anyhow::Result<Vec<RelatedQuestion>> {
    let mut request = CompletionRequest::simple(model, Some(RELATED_SYSTEM_PROMPT.to_string()), messages);
    request.tools = vec![tool_definition()];
    request.tool_choice = Some(ToolChoice::Tool(TOOL_NAME.to_string()));

    let response = provider.complete(&request).await?;
    let input = match response.tool_calls.into_iter().find(|c| c.name == TOOL_NAME) {
        Some(call) => serde_json::from_value::<RelatedQuestionsInput>(call.input)?,
        // Some backends answer with the JSON as text despite the forced tool.
        None => serde_json::from_str::<RelatedQuestionsInput>(response.content.trim())?,
    };

    Ok(input
        .questions
        .into_iter()
        .map(|q| q.question.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(QUESTION_COUNT)
        .map(|question| RelatedQuestion { question })
        .collect())
}

/// Input for the generator: the last user message followed by the response
/// messages of the turn.
pub fn related_input(history: &[Message], response: &[Message]) -> Vec<Message> {
    let mut messages: Vec<Message> = history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .cloned()
        .into_iter()
        .collect();
    messages.extend(response.iter().cloned());
    messages
}

/// Stream the related-questions part. Empty when the turn did not end with
/// an assistant message.
pub fn stream_related_questions(
    provider: Arc<BoxLlmProvider>,
    model: String,
    messages: Vec<Message>,
) -> Pin<Box<dyn Stream<Item = UiChunk> + Send + 'static>> {
    Box::pin(async_stream::stream! {
        if messages.last().is_none_or(|m| m.role != MessageRole::Assistant) {
            return;
        }

        let id = Uuid::now_v7().simple().to_string();
        yield UiChunk::DataRelatedQuestions {
            id: id.clone(),
            data: RelatedQuestionsData::with_status(RelatedStatus::Loading),
        };

        let span = tracing::info_span!("gen_ai.related_questions", gen_ai.request.model = %model);
        let result = tracing::Instrument::instrument(
            generate_related_questions(&provider, &model, messages),
            span,
        )
        .await;

        match result {
            Ok(questions) => {
                let mut collected = Vec::with_capacity(questions.len());
                for question in questions {
                    collected.push(question);
                    yield UiChunk::DataRelatedQuestions {
                        id: id.clone(),
                        data: RelatedQuestionsData {
                            status: RelatedStatus::Streaming,
                            questions: Some(collected.clone()),
                        },
                    };
                }
                yield UiChunk::DataRelatedQuestions {
                    id,
                    data: RelatedQuestionsData {
                        status: RelatedStatus::Success,
                        questions: Some(collected),
                    },
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "related questions failed");
                yield UiChunk::DataRelatedQuestions {
                    id,
                    data: RelatedQuestionsData::with_status(RelatedStatus::Error),
                };
            }
        }
    })
}
