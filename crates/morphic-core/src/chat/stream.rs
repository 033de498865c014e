//! Chat turn orchestration: the UI chunk stream behind `POST /api/chat`.
//!
//! Each turn runs in its own task and writes chunks into a channel. The
//! returned stream drains that channel. If the client disconnects the task
//! keeps going, so the response is still persisted.
//!
//! Persisted flow: start chunk, message preparation, title generation in
//! parallel for new chats, research, related questions, finish chunk, then
//! persistence. The ephemeral flow (guests, history disabled) runs the same
//! research on client-supplied history and stores nothing.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use morphic_types::chat::{ChatTrigger, ChatWithMessages};
use morphic_types::error::ChatError;
use morphic_types::llm::Message;
use morphic_types::message::{MessageMetadata, UiMessage};
use morphic_types::model::{ModelConfig, SearchMode};
use morphic_types::stream::UiChunk;

use crate::agent::related::{related_input, stream_related_questions};
use crate::agent::title::generate_chat_title;
use crate::agent::tools::ToolSet;
use crate::agent::{ResearchEvent, Researcher};
use crate::chat::accumulator::MessageAccumulator;
use crate::chat::context_window::{max_allowed_tokens, should_truncate, truncate_messages};
use crate::chat::convert::{prune_tool_calls, to_model_messages};
use crate::chat::persist::{PersistRequest, persist_stream_results};
use crate::chat::prepare::{PrepareContext, prepare_messages};
use crate::chat::reasoning::strip_reasoning_parts;
use crate::chat::repository::ChatRepository;
use crate::chat::service::ChatService;
use crate::fetch::PageFetcher;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::registry::ProviderRegistry;
use crate::search::SearchProvider;

pub type UiChunkStream = Pin<Box<dyn Stream<Item = UiChunk> + Send + 'static>>;

/// Tool results older than this many trailing messages are pruned from
/// model input.
const KEEP_RECENT_TOOL_MESSAGES: usize = 2;

const CHANNEL_CAPACITY: usize = 64;

/// Collaborators shared by every research run.
#[derive(Clone)]
pub struct ResearchDeps {
    pub providers: Arc<ProviderRegistry>,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    /// Model for follow-up questions; the research model is used when its
    /// provider is not enabled.
    pub related_model: ModelConfig,
}

/// A persisted chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub chat_id: String,
    pub user_id: String,
    pub trigger: ChatTrigger,
    pub message_id: Option<String>,
    pub message: Option<UiMessage>,
    /// The chat loaded during authorization; `None` for a new chat.
    pub existing: Option<ChatWithMessages>,
    pub model: ModelConfig,
    pub search_mode: SearchMode,
    pub trace_id: String,
}

/// A turn that is never stored.
#[derive(Debug, Clone)]
pub struct EphemeralTurn {
    pub messages: Vec<UiMessage>,
    pub model: ModelConfig,
    pub search_mode: SearchMode,
    pub trace_id: String,
}

/// Model input for a history: reasoning stripped for OpenAI models, old
/// tool traffic pruned, then truncated to the context budget.
pub fn build_model_messages(history: &[UiMessage], model: &ModelConfig) -> Vec<Message> {
    let converted = if model.provider_id == "openai" {
        to_model_messages(&strip_reasoning_parts(history))
    } else {
        to_model_messages(history)
    };
    let pruned = prune_tool_calls(converted, KEEP_RECENT_TOOL_MESSAGES);
    if should_truncate(&pruned, &model.id) {
        let truncated = truncate_messages(&pruned, max_allowed_tokens(&model.id));
        debug!(before = pruned.len(), after = truncated.len(), "history truncated");
        truncated
    } else {
        pruned
    }
}

// ---------------------------------------------------------------------------
// ChunkWriter
// ---------------------------------------------------------------------------

/// Sends chunks to the client while folding them into the response message.
struct ChunkWriter {
    tx: mpsc::Sender<UiChunk>,
    acc: MessageAccumulator,
    client_gone: bool,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<UiChunk>, message_id: &str) -> Self {
        Self {
            tx,
            acc: MessageAccumulator::new(message_id),
            client_gone: false,
        }
    }

    async fn write(&mut self, chunk: UiChunk) {
        self.acc.apply(&chunk);
        if !self.client_gone && self.tx.send(chunk).await.is_err() {
            self.client_gone = true;
            debug!("client disconnected, finishing turn in background");
        }
    }

    async fn fail(&mut self, error: impl std::fmt::Display) {
        self.write(UiChunk::Error {
            error_text: error.to_string(),
        })
        .await;
        self.write(UiChunk::Finish { message_metadata: None }).await;
    }

    fn into_message(self) -> UiMessage {
        self.acc.finish()
    }
}

fn spawn_turn<F, Fut>(trace_id: &str, run: F) -> UiChunkStream
where
    F: FnOnce(ChunkWriter) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let message_id = Uuid::now_v7().to_string();
    let span = info_span!("chat_turn", trace_id = %trace_id, message_id = %message_id);
    tokio::spawn(run(ChunkWriter::new(tx, &message_id)).instrument(span));

    Box::pin(async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield chunk;
        }
    })
}

fn start_chunk(message_id: &str, trace_id: &str, mode: SearchMode, model: &ModelConfig) -> UiChunk {
    UiChunk::Start {
        message_id: message_id.to_string(),
        message_metadata: Some(MessageMetadata {
            trace_id: Some(trace_id.to_string()),
            search_mode: Some(mode),
            model_id: Some(model.qualified_id()),
            feedback_score: None,
        }),
    }
}

/// Research plus related questions, written through `writer`.
async fn research(
    writer: &mut ChunkWriter,
    deps: &ResearchDeps,
    provider: Arc<BoxLlmProvider>,
    model: &ModelConfig,
    mode: SearchMode,
    history: Vec<Message>,
) {
    let tools = ToolSet::for_mode(mode, deps.search.clone(), deps.fetcher.clone());
    let mut events = Researcher::new(provider.clone(), model.id.clone(), mode, tools).run(history.clone());

    let mut outcome = None;
    while let Some(event) = events.next().await {
        match event {
            ResearchEvent::Chunk(chunk) => writer.write(chunk).await,
            ResearchEvent::Finished(o) => outcome = Some(o),
        }
    }

    let Some(outcome) = outcome.filter(|o| o.ends_with_assistant()) else {
        return;
    };
    let (related_provider, related_model) = match deps.providers.for_model(&deps.related_model) {
        Ok(p) => (p, deps.related_model.id.clone()),
        Err(_) => (provider, model.id.clone()),
    };
    let mut related = stream_related_questions(
        related_provider,
        related_model,
        related_input(&history, &outcome.response_messages),
    );
    while let Some(chunk) = related.next().await {
        writer.write(chunk).await;
    }
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Stream a persisted chat turn.
pub fn create_chat_stream<R: ChatRepository + 'static>(
    chats: Arc<ChatService<R>>,
    deps: ResearchDeps,
    turn: ChatTurn,
) -> UiChunkStream {
    let trace_id = turn.trace_id.clone();
    spawn_turn(&trace_id, move |mut writer| async move {
        let message_id = writer.acc.message().id.clone();
        writer
            .write(start_chunk(&message_id, &turn.trace_id, turn.search_mode, &turn.model))
            .await;

        let provider = match deps.providers.for_model(&turn.model) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "model provider unavailable");
                return writer.fail(e).await;
            }
        };

        let is_new = turn.existing.is_none();
        let submitted = turn.trigger == ChatTrigger::SubmitMessage;
        let user_text = turn.message.as_ref().map(UiMessage::text).unwrap_or_default();
        let title_task = (is_new && submitted).then(|| {
            let provider = provider.clone();
            let model = turn.model.id.clone();
            tokio::spawn(async move { generate_chat_title(&provider, &model, &user_text).await })
        });

        let prepared = prepare_messages(
            &chats,
            PrepareContext {
                chat_id: turn.chat_id.clone(),
                user_id: turn.user_id.clone(),
                trigger: turn.trigger,
                message_id: turn.message_id.clone(),
                message: turn.message.clone(),
                existing: turn.existing.clone(),
            },
        )
        .await;
        let (history, initial_save_ok) = match prepared {
            Ok(history) => (history, true),
            Err(ChatError::Repository(e)) if is_new && submitted && turn.message.is_some() => {
                warn!(error = %e, "initial chat save failed, continuing unsaved");
                (turn.message.clone().into_iter().collect(), false)
            }
            Err(e) => {
                warn!(error = %e, "preparing messages failed");
                return writer.fail(e).await;
            }
        };

        let model_messages = build_model_messages(&history, &turn.model);
        research(&mut writer, &deps, provider, &turn.model, turn.search_mode, model_messages).await;
        writer.write(UiChunk::Finish { message_metadata: None }).await;

        let title = match title_task {
            Some(task) => task.await.ok(),
            None => None,
        };
        persist_stream_results(
            &chats,
            PersistRequest {
                chat_id: turn.chat_id.clone(),
                user_id: turn.user_id.clone(),
                response: writer.into_message(),
                title,
                trace_id: Some(turn.trace_id.clone()),
                search_mode: Some(turn.search_mode),
                model_id: Some(turn.model.qualified_id()),
                initial_save_ok,
                initial_user_message: turn.message.clone(),
            },
        )
        .await;
    })
}

/// Stream a turn over client-supplied history without storing anything.
pub fn create_ephemeral_stream(deps: ResearchDeps, turn: EphemeralTurn) -> Result<UiChunkStream, ChatError> {
    if turn.messages.is_empty() {
        return Err(ChatError::InvalidRequest("messages are required".to_string()));
    }

    let trace_id = turn.trace_id.clone();
    Ok(spawn_turn(&trace_id, move |mut writer| async move {
        let message_id = writer.acc.message().id.clone();
        writer
            .write(start_chunk(&message_id, &turn.trace_id, turn.search_mode, &turn.model))
            .await;

        let provider = match deps.providers.for_model(&turn.model) {
            Ok(p) => p,
            Err(e) => return writer.fail(e).await,
        };

        let model_messages = build_model_messages(&turn.messages, &turn.model);
        research(&mut writer, &deps, provider, &turn.model, turn.search_mode, model_messages).await;
        writer.write(UiChunk::Finish { message_metadata: None }).await;
    }))
}
