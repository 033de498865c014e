//! Product analytics port.
//!
//! Tracking never fails a request: sinks swallow their own errors.

use async_trait::async_trait;
use serde::Serialize;

use morphic_types::model::{ModelType, SearchMode};

/// Emitted once per accepted chat request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    pub search_mode: SearchMode,
    pub model_type: Option<ModelType>,
    pub conversation_turn: usize,
    pub is_new_chat: bool,
    pub trigger: String,
    pub chat_id: String,
    pub user_id: String,
    pub model_id: String,
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track_chat_message(&self, event: ChatMessageEvent);
}

/// Sink that drops every event.
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn track_chat_message(&self, _event: ChatMessageEvent) {}
}

/// 1-based count of user turns in a conversation.
pub fn conversation_turn(messages: &[morphic_types::message::UiMessage]) -> usize {
    messages
        .iter()
        .filter(|m| m.role == morphic_types::message::MessageRole::User)
        .count()
        .max(1)
}
