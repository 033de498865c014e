//! In-crate test doubles: a scripted LLM provider and in-memory repositories.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use morphic_types::chat::{Chat, Visibility};
use morphic_types::error::RepositoryError;
use morphic_types::feedback::SiteFeedback;
use morphic_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, StreamEvent,
    ToolCall, Usage,
};
use morphic_types::message::{MessageMetadata, UiMessage};

use crate::chat::repository::{ChatRepository, FeedbackRepository};
use crate::llm::provider::{LlmEventStream, LlmProvider};

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum Turn {
    Text(String),
    Reasoned { reasoning: String, text: String },
    Tools(Vec<ToolCall>),
    Fail,
}

impl Turn {
    fn events(&self) -> Result<Vec<StreamEvent>, LlmError> {
        let usage = StreamEvent::Usage(Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        match self {
            Turn::Text(text) => Ok(vec![
                StreamEvent::TextDelta { text: text.clone() },
                StreamEvent::MessageDelta {
                    stop_reason: StopReason::EndTurn,
                },
                usage,
                StreamEvent::Done,
            ]),
            Turn::Reasoned { reasoning, text } => Ok(vec![
                StreamEvent::ReasoningDelta {
                    text: reasoning.clone(),
                },
                StreamEvent::TextDelta { text: text.clone() },
                StreamEvent::MessageDelta {
                    stop_reason: StopReason::EndTurn,
                },
                usage,
                StreamEvent::Done,
            ]),
            Turn::Tools(calls) => {
                let mut events: Vec<StreamEvent> = calls
                    .iter()
                    .map(|c| StreamEvent::ToolUseComplete {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        input: c.input.clone(),
                    })
                    .collect();
                events.push(StreamEvent::MessageDelta {
                    stop_reason: StopReason::ToolUse,
                });
                events.push(usage);
                events.push(StreamEvent::Done);
                Ok(events)
            }
            Turn::Fail => Err(LlmError::Provider {
                message: "scripted failure".to_string(),
            }),
        }
    }
}

/// LLM provider that replays scripted turns. The last turn repeats once the
/// script is exhausted.
pub struct ScriptedProvider {
    name: String,
    capabilities: ProviderCapabilities,
    turns: Mutex<VecDeque<Turn>>,
    last: Mutex<Option<Turn>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, turns: Vec<Turn>) -> Self {
        Self {
            name: name.to_string(),
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                reasoning: false,
                max_context_tokens: 128_000,
                max_output_tokens: 8_192,
            },
            turns: Mutex::new(turns.into()),
            last: Mutex::new(None),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn text(name: &str, text: &str) -> Self {
        Self::new(name, vec![Turn::Text(text.to_string())])
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, vec![Turn::Fail])
    }

    /// Shared handle to every request received so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }

    fn next_turn(&self, request: &CompletionRequest) -> Turn {
        self.requests.lock().unwrap().push(request.clone());
        let mut last = self.last.lock().unwrap();
        match self.turns.lock().unwrap().pop_front() {
            Some(turn) => {
                *last = Some(turn.clone());
                turn
            }
            None => last.clone().unwrap_or(Turn::Fail),
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let events = self.next_turn(request).events()?;
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut stop_reason = StopReason::EndTurn;
        for event in events {
            match event {
                StreamEvent::TextDelta { text } => content.push_str(&text),
                StreamEvent::ToolUseComplete { id, name, input } => {
                    tool_calls.push(ToolCall { id, name, input })
                }
                StreamEvent::MessageDelta { stop_reason: sr } => stop_reason = sr,
                _ => {}
            }
        }
        Ok(CompletionResponse {
            id: "scripted".to_string(),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
            tool_calls,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let turn = self.next_turn(&request);
        Box::pin(async_stream::stream! {
            match turn.events() {
                Ok(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// InMemoryChatRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Store {
    chats: Vec<Chat>,
    messages: Vec<(String, UiMessage)>,
}

/// Chat repository over a mutex-guarded vector, with the same ownership
/// checks as the SQLite implementation.
#[derive(Default)]
pub struct InMemoryChatRepository {
    store: Mutex<Store>,
    failing_upserts: AtomicU32,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `upsert_message` fail.
    pub fn fail_next_upserts(&self, n: u32) {
        self.failing_upserts.store(n, Ordering::SeqCst);
    }

    pub fn message_ids(&self, chat_id: &str) -> Vec<String> {
        let store = self.store.lock().unwrap();
        store
            .messages
            .iter()
            .filter(|(c, _)| c == chat_id)
            .map(|(_, m)| m.id.clone())
            .collect()
    }

    fn owned<'a>(store: &'a mut Store, chat_id: &str, user_id: &str) -> Result<&'a mut Chat, RepositoryError> {
        let chat = store
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or(RepositoryError::NotFound)?;
        if chat.user_id != user_id {
            return Err(RepositoryError::RlsViolation("chats".to_string()));
        }
        Ok(chat)
    }
}

impl ChatRepository for InMemoryChatRepository {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if let Some(existing) = store.chats.iter().find(|c| c.id == chat.id) {
            if existing.user_id != chat.user_id {
                return Err(RepositoryError::RlsViolation("chats".to_string()));
            }
            return Ok(existing.clone());
        }
        store.chats.push(chat.clone());
        Ok(chat.clone())
    }

    async fn create_chat_with_first_message(
        &self,
        chat: &Chat,
        message: &UiMessage,
    ) -> Result<(), RepositoryError> {
        self.create_chat(chat).await?;
        self.upsert_message(&chat.id, Some(&chat.user_id), message).await
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.chats.iter().find(|c| c.id == chat_id).cloned())
    }

    async fn list_chats(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<Chat>, RepositoryError> {
        let store = self.store.lock().unwrap();
        let mut chats: Vec<Chat> = store.chats.iter().filter(|c| c.user_id == user_id).cloned().collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn update_chat_title(&self, chat_id: &str, user_id: &str, title: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::owned(&mut store, chat_id, user_id)?.title = title.to_string();
        Ok(())
    }

    async fn update_chat_visibility(
        &self,
        chat_id: &str,
        user_id: &str,
        visibility: Visibility,
    ) -> Result<Chat, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let chat = Self::owned(&mut store, chat_id, user_id)?;
        chat.visibility = visibility;
        Ok(chat.clone())
    }

    async fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::owned(&mut store, chat_id, user_id)?;
        store.chats.retain(|c| c.id != chat_id);
        store.messages.retain(|(c, _)| c != chat_id);
        Ok(())
    }

    async fn clear_chats(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let ids: Vec<String> = store
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id.clone())
            .collect();
        store.chats.retain(|c| c.user_id != user_id);
        store.messages.retain(|(c, _)| !ids.contains(c));
        Ok(ids)
    }

    async fn load_messages(&self, chat_id: &str) -> Result<Vec<UiMessage>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .messages
            .iter()
            .filter(|(c, _)| c == chat_id)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn upsert_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        message: &UiMessage,
    ) -> Result<(), RepositoryError> {
        let pending = self.failing_upserts.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_upserts.store(pending - 1, Ordering::SeqCst);
            return Err(RepositoryError::Query("database is locked".to_string()));
        }
        let mut store = self.store.lock().unwrap();
        match user_id {
            Some(user_id) => {
                Self::owned(&mut store, chat_id, user_id)?;
            }
            None => {
                if !store.chats.iter().any(|c| c.id == chat_id) {
                    return Err(RepositoryError::NotFound);
                }
            }
        }
        if let Some(slot) = store.messages.iter_mut().find(|(_, m)| m.id == message.id) {
            slot.1 = message.clone();
        } else {
            store.messages.push((chat_id.to_string(), message.clone()));
        }
        Ok(())
    }

    async fn delete_messages_from(
        &self,
        chat_id: &str,
        user_id: &str,
        message_id: &str,
        inclusive: bool,
    ) -> Result<u64, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        Self::owned(&mut store, chat_id, user_id)?;
        let ids: Vec<String> = store
            .messages
            .iter()
            .filter(|(c, _)| c == chat_id)
            .map(|(_, m)| m.id.clone())
            .collect();
        let Some(index) = ids.iter().position(|id| id == message_id) else {
            return Ok(0);
        };
        let start = if inclusive { index } else { index + 1 };
        let doomed = &ids[start..];
        store.messages.retain(|(c, m)| c != chat_id || !doomed.contains(&m.id));
        Ok(doomed.len() as u64)
    }

    async fn update_message_metadata(
        &self,
        message_id: &str,
        patch: &MessageMetadata,
    ) -> Result<Option<String>, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let Some((chat_id, message)) = store.messages.iter_mut().find(|(_, m)| m.id == message_id) else {
            return Ok(None);
        };
        let metadata = message.metadata.get_or_insert_with(MessageMetadata::default);
        if patch.feedback_score.is_some() {
            metadata.feedback_score = patch.feedback_score;
        }
        if patch.trace_id.is_some() {
            metadata.trace_id = patch.trace_id.clone();
        }
        Ok(Some(chat_id.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryFeedbackRepository {
    pub saved: Mutex<Vec<SiteFeedback>>,
}

impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn save_feedback(&self, feedback: &SiteFeedback) -> Result<(), RepositoryError> {
        self.saved.lock().unwrap().push(feedback.clone());
        Ok(())
    }
}
