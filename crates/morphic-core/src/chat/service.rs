//! Chat service: authorization, caching, and history operations.
//!
//! Reads of a chat with its messages go through the memory cache under
//! `{chat_id}-messages`. Every write to a chat invalidates all of its keys
//! with `delete_pattern("{chat_id}-")`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use morphic_types::chat::{Chat, ChatPage, ChatWithMessages, UNTITLED_CHAT, Visibility};
use morphic_types::error::{ChatError, RepositoryError};
use morphic_types::feedback::FeedbackScore;
use morphic_types::message::{MessageMetadata, UiMessage};

use crate::cache::MemoryCache;
use crate::chat::repository::ChatRepository;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Map ownership failures of a write onto chat errors.
fn owned(e: RepositoryError) -> ChatError {
    match e {
        RepositoryError::NotFound => ChatError::NotFound,
        RepositoryError::RlsViolation(_) => ChatError::Forbidden,
        other => ChatError::Repository(other),
    }
}

/// Orchestrates chat reads and writes on top of a `ChatRepository`.
///
/// Generic over the repository to keep morphic-core free of infra.
pub struct ChatService<R: ChatRepository> {
    repo: R,
    cache: Arc<MemoryCache<ChatWithMessages>>,
}

impl<R: ChatRepository> ChatService<R> {
    pub fn new(repo: R, cache: Arc<MemoryCache<ChatWithMessages>>) -> Self {
        Self { repo, cache }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn cache(&self) -> &Arc<MemoryCache<ChatWithMessages>> {
        &self.cache
    }

    /// Drop every cached entry of a chat.
    pub fn invalidate(&self, chat_id: &str) {
        let removed = self.cache.delete_pattern(&format!("{chat_id}-"));
        if removed > 0 {
            debug!(chat_id, removed, "invalidated chat cache");
        }
    }

    // --- Reads ---

    /// The chat if `user_id` may read it.
    pub async fn get_chat(&self, chat_id: &str, user_id: &str) -> Result<Option<Chat>, ChatError> {
        let chat = self.repo.get_chat(chat_id).await?;
        Ok(chat.filter(|c| c.is_readable_by(user_id)))
    }

    /// Chat plus messages if `user_id` may read it, served from cache.
    pub async fn get_chat_with_messages(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> Result<Option<ChatWithMessages>, ChatError> {
        let loaded = self.load_cached(chat_id).await?;
        Ok(loaded.filter(|c| c.chat.is_readable_by(user_id)))
    }

    /// A chat anyone may read because it has been shared.
    pub async fn get_shared_chat(&self, chat_id: &str) -> Result<Option<ChatWithMessages>, ChatError> {
        let loaded = self.load_cached(chat_id).await?;
        Ok(loaded.filter(|c| c.chat.visibility == Visibility::Public))
    }

    async fn load_cached(&self, chat_id: &str) -> Result<Option<ChatWithMessages>, ChatError> {
        let key = format!("{chat_id}-messages");
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Some(hit));
        }
        let Some(chat) = self.repo.get_chat(chat_id).await? else {
            return Ok(None);
        };
        let messages = self.repo.load_messages(chat_id).await?;
        let loaded = ChatWithMessages { chat, messages };
        self.cache.set(&key, loaded.clone());
        Ok(Some(loaded))
    }

    /// One page of `user_id`'s chats, newest first.
    ///
    /// `next_offset` is set only when the page came back full.
    pub async fn get_chats_page(&self, user_id: &str, limit: u32, offset: u32) -> Result<ChatPage, ChatError> {
        let chats = self.repo.list_chats(user_id, limit, offset).await?;
        let next_offset = (limit > 0 && chats.len() as u32 == limit).then_some(offset + limit);
        Ok(ChatPage { chats, next_offset })
    }

    /// Load a chat for posting a new message.
    ///
    /// `Forbidden` when the chat exists and belongs to someone else.
    pub async fn authorize_post(&self, chat_id: &str, user_id: &str) -> Result<Option<ChatWithMessages>, ChatError> {
        let loaded = self.load_cached(chat_id).await?;
        match loaded {
            Some(existing) if existing.chat.user_id != user_id => {
                warn!(chat_id, "rejected post to chat owned by another user");
                Err(ChatError::Forbidden)
            }
            other => Ok(other),
        }
    }

    // --- Writes ---

    /// Create an `Untitled` chat owned by `user_id`.
    pub async fn create_chat(&self, chat_id: &str, user_id: &str) -> Result<Chat, ChatError> {
        let chat = Chat {
            id: chat_id.to_string(),
            title: UNTITLED_CHAT.to_string(),
            user_id: user_id.to_string(),
            visibility: Visibility::Private,
            created_at: Utc::now(),
        };
        let created = self.repo.create_chat(&chat).await.map_err(owned)?;
        self.invalidate(chat_id);
        Ok(created)
    }

    pub async fn create_chat_with_first_message(
        &self,
        chat_id: &str,
        user_id: &str,
        message: &UiMessage,
    ) -> Result<(), ChatError> {
        let chat = Chat {
            id: chat_id.to_string(),
            title: UNTITLED_CHAT.to_string(),
            user_id: user_id.to_string(),
            visibility: Visibility::Private,
            created_at: Utc::now(),
        };
        self.repo
            .create_chat_with_first_message(&chat, message)
            .await
            .map_err(owned)?;
        self.invalidate(chat_id);
        Ok(())
    }

    pub async fn upsert_message(&self, chat_id: &str, user_id: &str, message: &UiMessage) -> Result<(), ChatError> {
        self.repo
            .upsert_message(chat_id, Some(user_id), message)
            .await
            .map_err(owned)?;
        self.invalidate(chat_id);
        Ok(())
    }

    pub async fn delete_messages_from(
        &self,
        chat_id: &str,
        user_id: &str,
        message_id: &str,
        inclusive: bool,
    ) -> Result<u64, ChatError> {
        let deleted = self
            .repo
            .delete_messages_from(chat_id, user_id, message_id, inclusive)
            .await
            .map_err(owned)?;
        self.invalidate(chat_id);
        Ok(deleted)
    }

    pub async fn update_title(&self, chat_id: &str, user_id: &str, title: &str) -> Result<(), ChatError> {
        self.repo
            .update_chat_title(chat_id, user_id, title)
            .await
            .map_err(owned)?;
        self.invalidate(chat_id);
        Ok(())
    }

    pub async fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<(), ChatError> {
        self.repo.delete_chat(chat_id, user_id).await.map_err(owned)?;
        self.invalidate(chat_id);
        info!(chat_id, "chat deleted");
        Ok(())
    }

    /// Delete all of `user_id`'s chats. Returns how many were removed.
    pub async fn clear_chats(&self, user_id: &str) -> Result<usize, ChatError> {
        let ids = self.repo.clear_chats(user_id).await?;
        for id in &ids {
            self.invalidate(id);
        }
        info!(count = ids.len(), "chat history cleared");
        Ok(ids.len())
    }

    /// Make a chat public and return it.
    pub async fn share_chat(&self, chat_id: &str, user_id: &str) -> Result<Chat, ChatError> {
        let chat = self
            .repo
            .update_chat_visibility(chat_id, user_id, Visibility::Public)
            .await
            .map_err(owned)?;
        self.invalidate(chat_id);
        Ok(chat)
    }

    /// Record a thumbs up/down in the message metadata.
    ///
    /// Returns false when the message does not exist.
    pub async fn update_message_feedback(&self, message_id: &str, score: FeedbackScore) -> Result<bool, ChatError> {
        let patch = MessageMetadata {
            feedback_score: Some(score.as_i8()),
            ..Default::default()
        };
        match self.repo.update_message_metadata(message_id, &patch).await? {
            Some(chat_id) => {
                self.invalidate(&chat_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
