//! The researcher agent loop.
//!
//! Each step streams one model turn, forwards text and reasoning deltas as
//! UI chunks, executes the server-side tool calls concurrently, and feeds
//! their results back for the next step. The loop ends when the model
//! answers without tool calls, calls a client-side tool, fails, or runs out
//! of steps.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::info_span;
use uuid::Uuid;

use morphic_types::error::ToolError;
use morphic_types::llm::{CompletionRequest, Message, StreamEvent, ToolCall, ToolChoice, Usage};
use morphic_types::model::SearchMode;
use morphic_types::stream::UiChunk;

use super::prompts::system_prompt;
use super::tools::{ToolContext, ToolSet};
use crate::llm::box_provider::BoxLlmProvider;

pub const DEFAULT_MAX_STEPS: usize = 20;

/// Item of the researcher stream.
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    Chunk(UiChunk),
    /// Always the last item.
    Finished(ResearchOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResearchStop {
    /// The model answered without calling tools.
    Completed,
    /// The model called a client-side tool and waits for the user.
    AwaitingClient,
    StepLimit,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// Assistant and tool messages produced during the run.
    pub response_messages: Vec<Message>,
    pub steps: usize,
    pub usage: Usage,
    pub stop: ResearchStop,
}

impl ResearchOutcome {
    /// Whether the run ended on an assistant message.
    pub fn ends_with_assistant(&self) -> bool {
        self.response_messages
            .last()
            .is_some_and(|m| m.role == morphic_types::llm::MessageRole::Assistant)
    }
}

pub type ResearchStream = Pin<Box<dyn Stream<Item = ResearchEvent> + Send + 'static>>;

pub struct Researcher {
    provider: Arc<BoxLlmProvider>,
    model_id: String,
    mode: SearchMode,
    tools: ToolSet,
    max_steps: usize,
}

impl Researcher {
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        model_id: impl Into<String>,
        mode: SearchMode,
        tools: ToolSet,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            mode,
            tools,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Run the loop over `history` (model messages, oldest first).
    pub fn run(self, history: Vec<Message>) -> ResearchStream {
        Box::pin(async_stream::stream! {
            let system = system_prompt(self.mode, chrono::Utc::now());
            let definitions = self.tools.definitions();
            let max_tokens = self.provider.capabilities().max_output_tokens;
            let mut response: Vec<Message> = Vec::new();
            let mut usage = Usage::default();
            let mut steps = 0;

            let stop = loop {
                if steps >= self.max_steps {
                    break ResearchStop::StepLimit;
                }
                steps += 1;
                yield ResearchEvent::Chunk(UiChunk::StartStep);

                let mut messages = history.clone();
                messages.extend(response.iter().cloned());
                let request = CompletionRequest {
                    model: self.model_id.clone(),
                    messages,
                    system: Some(system.clone()),
                    max_tokens,
                    temperature: None,
                    stream: true,
                    stop_sequences: None,
                    tools: definitions.clone(),
                    tool_choice: (!definitions.is_empty()).then_some(ToolChoice::Auto),
                };

                let span = info_span!(
                    "gen_ai.chat",
                    gen_ai.system = self.provider.name(),
                    gen_ai.request.model = %self.model_id,
                    gen_ai.request.max_tokens = max_tokens,
                    morphic.search_mode = %self.mode,
                    morphic.step = steps,
                );
                let mut events = InSpan {
                    inner: self.provider.stream(request),
                    span,
                };

                let mut text = String::new();
                let mut text_id: Option<String> = None;
                let mut reasoning_id: Option<String> = None;
                let mut calls: Vec<ToolCall> = Vec::new();
                let mut failure: Option<String> = None;

                while let Some(event) = events.next().await {
                    match event {
                        Ok(StreamEvent::ReasoningDelta { text: delta }) => {
                            let id = match &reasoning_id {
                                Some(id) => id.clone(),
                                None => {
                                    let id = part_id();
                                    reasoning_id = Some(id.clone());
                                    yield ResearchEvent::Chunk(UiChunk::ReasoningStart { id: id.clone() });
                                    id
                                }
                            };
                            yield ResearchEvent::Chunk(UiChunk::ReasoningDelta { id, delta });
                        }
                        Ok(StreamEvent::TextDelta { text: delta }) => {
                            if let Some(id) = reasoning_id.take() {
                                yield ResearchEvent::Chunk(UiChunk::ReasoningEnd { id });
                            }
                            let id = match &text_id {
                                Some(id) => id.clone(),
                                None => {
                                    let id = part_id();
                                    text_id = Some(id.clone());
                                    yield ResearchEvent::Chunk(UiChunk::TextStart { id: id.clone() });
                                    id
                                }
                            };
                            text.push_str(&delta);
                            yield ResearchEvent::Chunk(UiChunk::TextDelta { id, delta });
                        }
                        Ok(StreamEvent::ToolUseComplete { id, name, input }) => {
                            yield ResearchEvent::Chunk(UiChunk::ToolInputAvailable {
                                tool_call_id: id.clone(),
                                tool_name: name.clone(),
                                input: input.clone(),
                            });
                            calls.push(ToolCall { id, name, input });
                        }
                        Ok(StreamEvent::Usage(u)) => {
                            usage.input_tokens += u.input_tokens;
                            usage.output_tokens += u.output_tokens;
                        }
                        Ok(StreamEvent::Done) => break,
                        Ok(StreamEvent::Connected | StreamEvent::MessageDelta { .. }) => {}
                        Err(e) => {
                            failure = Some(e.to_string());
                            break;
                        }
                    }
                }

                if let Some(id) = reasoning_id.take() {
                    yield ResearchEvent::Chunk(UiChunk::ReasoningEnd { id });
                }
                if let Some(id) = text_id.take() {
                    yield ResearchEvent::Chunk(UiChunk::TextEnd { id });
                }
                if !text.is_empty() || !calls.is_empty() {
                    response.push(Message::assistant_with_tools(text, calls.clone()));
                }

                if let Some(message) = failure {
                    tracing::error!(step = steps, error = %message, "researcher step failed");
                    yield ResearchEvent::Chunk(UiChunk::Error { error_text: message.clone() });
                    break ResearchStop::Failed(message);
                }

                let results =
                    futures_util::future::join_all(calls.iter().map(|call| run_tool(&self.tools, call))).await;

                let mut awaiting_client = false;
                for (call, result) in calls.iter().zip(results) {
                    match result {
                        Some(Ok(output)) => {
                            response.push(Message::tool_result(&call.id, output.to_string()));
                            yield ResearchEvent::Chunk(UiChunk::ToolOutputAvailable {
                                tool_call_id: call.id.clone(),
                                output,
                            });
                        }
                        Some(Err(e)) => {
                            tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                            response.push(Message::tool_result(&call.id, format!("Error: {e}")));
                            yield ResearchEvent::Chunk(UiChunk::ToolOutputError {
                                tool_call_id: call.id.clone(),
                                error_text: e.to_string(),
                            });
                        }
                        None => awaiting_client = true,
                    }
                }

                yield ResearchEvent::Chunk(UiChunk::FinishStep);

                if awaiting_client {
                    break ResearchStop::AwaitingClient;
                }
                if calls.is_empty() {
                    break ResearchStop::Completed;
                }
            };

            tracing::info!(
                steps,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop = ?stop,
                "research finished"
            );

            yield ResearchEvent::Finished(ResearchOutcome {
                response_messages: response,
                steps,
                usage,
                stop,
            });
        })
    }
}

/// `None` for client-side tools, which have no server result.
async fn run_tool(tools: &ToolSet, call: &ToolCall) -> Option<Result<Value, ToolError>> {
    let Some(tool) = tools.get(&call.name) else {
        return Some(Err(ToolError::UnknownTool(call.name.clone())));
    };
    if tool.is_client_side() {
        return None;
    }
    let ctx = ToolContext {
        tool_call_id: call.id.clone(),
    };
    Some(tool.execute(call.input.clone(), &ctx).await)
}

fn part_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Keeps a tracing span entered while the inner stream is polled, so the span
/// covers the whole streamed generation rather than just its creation.
struct InSpan<S> {
    inner: S,
    span: tracing::Span,
}

impl<S: Stream + Unpin> Stream for InSpan<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::{QuestionTool, SearchTool};
    use crate::search::SearchProvider;
    use crate::testing::{ScriptedProvider, Turn};
    use async_trait::async_trait;
    use morphic_types::error::SearchError;
    use morphic_types::llm::MessageRole;
    use morphic_types::search::{SearchRequest, SearchResultItem, SearchResults};
    use serde_json::json;

    struct OneResult;

    #[async_trait]
    impl SearchProvider for OneResult {
        fn name(&self) -> &str {
            "one"
        }

        async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
            Ok(SearchResults {
                results: vec![SearchResultItem {
                    title: "Rust".into(),
                    url: "https://rust-lang.org".into(),
                    content: "Systems language".into(),
                }],
                query: request.query.clone(),
                ..Default::default()
            })
        }
    }

    fn call(id: &str, name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    fn researcher(provider: ScriptedProvider, tools: ToolSet) -> Researcher {
        Researcher::new(
            Arc::new(BoxLlmProvider::new(provider)),
            "test-model",
            SearchMode::Quick,
            tools,
        )
    }

    async fn collect(r: Researcher) -> (Vec<UiChunk>, ResearchOutcome) {
        let events: Vec<ResearchEvent> = r.run(vec![Message::user("what is rust?")]).collect().await;
        let mut chunks = Vec::new();
        let mut outcome = None;
        for event in events {
            match event {
                ResearchEvent::Chunk(c) => chunks.push(c),
                ResearchEvent::Finished(o) => outcome = Some(o),
            }
        }
        (chunks, outcome.expect("finished event"))
    }

    fn kinds(chunks: &[UiChunk]) -> Vec<String> {
        chunks
            .iter()
            .map(|c| serde_json::to_value(c).unwrap()["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_text_only_turn_completes_in_one_step() {
        let (chunks, outcome) = collect(researcher(ScriptedProvider::text("p", "Hello"), ToolSet::new())).await;
        assert_eq!(
            kinds(&chunks),
            vec!["start-step", "text-start", "text-delta", "text-end", "finish-step"]
        );
        assert_eq!(outcome.stop, ResearchStop::Completed);
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.response_messages.len(), 1);
        assert_eq!(outcome.response_messages[0].content, "Hello");
        assert!(outcome.ends_with_assistant());
        assert_eq!(outcome.usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn test_tool_results_feed_the_next_step() {
        let provider = ScriptedProvider::new(
            "p",
            vec![
                Turn::Tools(vec![call("call_1", "search", json!({"query": "rust"}))]),
                Turn::Text("Rust is a language [1](#call_1).".into()),
            ],
        );
        let requests = provider.requests();
        let tools = ToolSet::new().with(SearchTool::new(Arc::new(OneResult)));
        let (chunks, outcome) = collect(researcher(provider, tools)).await;

        assert_eq!(outcome.stop, ResearchStop::Completed);
        assert_eq!(outcome.steps, 2);
        let output = chunks
            .iter()
            .find_map(|c| match c {
                UiChunk::ToolOutputAvailable { output, .. } => Some(output.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(output["toolCallId"], "call_1");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].tool_calls[0].id, "call_1");
        assert_eq!(second[2].role, MessageRole::Tool);
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(requests[0].system.as_deref().unwrap().contains("Current date and time"));
        assert_eq!(requests[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_client_tool_stops_the_loop() {
        let provider = ScriptedProvider::new(
            "p",
            vec![Turn::Tools(vec![call(
                "q1",
                "askQuestion",
                json!({"question": "Which?", "options": [], "allowsInput": true}),
            )])],
        );
        let (chunks, outcome) = collect(researcher(provider, ToolSet::new().with(QuestionTool))).await;
        assert_eq!(outcome.stop, ResearchStop::AwaitingClient);
        assert_eq!(outcome.steps, 1);
        assert!(kinds(&chunks).contains(&"tool-input-available".to_string()));
        assert!(!kinds(&chunks).contains(&"tool-output-available".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_and_continues() {
        let provider = ScriptedProvider::new(
            "p",
            vec![
                Turn::Tools(vec![call("c1", "teleport", json!({}))]),
                Turn::Text("Sorry.".into()),
            ],
        );
        let (chunks, outcome) = collect(researcher(provider, ToolSet::new())).await;
        assert!(chunks.iter().any(|c| matches!(
            c,
            UiChunk::ToolOutputError { error_text, .. } if error_text.contains("teleport")
        )));
        assert_eq!(outcome.stop, ResearchStop::Completed);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let provider = ScriptedProvider::new(
            "p",
            vec![Turn::Tools(vec![call("c", "search", json!({"query": "again"}))])],
        );
        let tools = ToolSet::new().with(SearchTool::new(Arc::new(OneResult)));
        let (_, outcome) = collect(researcher(provider, tools).max_steps(3)).await;
        assert_eq!(outcome.stop, ResearchStop::StepLimit);
        assert_eq!(outcome.steps, 3);
        assert!(!outcome.ends_with_assistant());
    }

    #[tokio::test]
    async fn test_provider_failure_emits_error_chunk() {
        let (chunks, outcome) = collect(researcher(ScriptedProvider::failing("p"), ToolSet::new())).await;
        assert!(matches!(outcome.stop, ResearchStop::Failed(_)));
        assert!(matches!(chunks.last(), Some(UiChunk::Error { .. })));
    }

    #[tokio::test]
    async fn test_reasoning_closes_before_text() {
        let provider = ScriptedProvider::new(
            "p",
            vec![Turn::Reasoned {
                reasoning: "thinking".into(),
                text: "Answer".into(),
            }],
        );
        let (chunks, _) = collect(researcher(provider, ToolSet::new())).await;
        assert_eq!(
            kinds(&chunks),
            vec![
                "start-step",
                "reasoning-start",
                "reasoning-delta",
                "reasoning-end",
                "text-start",
                "text-delta",
                "text-end",
                "finish-step"
            ]
        );
    }
}
