//! Persistence ports for chats, messages, and site feedback.
//!
//! Implementations live in morphic-infra (`SqliteChatRepository`,
//! `SqliteFeedbackRepository`). Every user-scoped write takes the acting
//! user id; an implementation must refuse writes to rows owned by someone
//! else with `RepositoryError::RlsViolation`.

use morphic_types::chat::{Chat, Visibility};
use morphic_types::error::RepositoryError;
use morphic_types::feedback::SiteFeedback;
use morphic_types::message::{MessageMetadata, UiMessage};

/// Repository trait for chats and their messages.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Insert a chat owned by `chat.user_id`. Creating an id that already
    /// exists is a no-op when the caller owns it.
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Create a chat and store its first message in one transaction.
    fn create_chat_with_first_message(
        &self,
        chat: &Chat,
        message: &UiMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_chat(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Chats owned by `user_id`, newest first.
    fn list_chats(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    fn update_chat_title(
        &self,
        chat_id: &str,
        user_id: &str,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Change visibility and return the updated chat.
    fn update_chat_visibility(
        &self,
        chat_id: &str,
        user_id: &str,
        visibility: Visibility,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Delete a chat and (by cascade) its messages and parts.
    ///
    /// `NotFound` when the chat does not exist, `RlsViolation` when it
    /// belongs to another user.
    fn delete_chat(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every chat owned by `user_id`, returning the deleted ids.
    fn clear_chats(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Messages of a chat in creation order, parts in `order`.
    fn load_messages(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<UiMessage>, RepositoryError>> + Send;

    /// Insert or replace a message and all of its parts.
    ///
    /// With `user_id = None` the ownership predicate is skipped.
    fn upsert_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        message: &UiMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete `message_id` (when `inclusive`) and every later message of the
    /// chat. Returns the number of deleted messages.
    fn delete_messages_from(
        &self,
        chat_id: &str,
        user_id: &str,
        message_id: &str,
        inclusive: bool,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Merge the set fields of `patch` into the stored metadata.
    ///
    /// Returns the owning chat id, or `None` when the message is unknown.
    fn update_message_metadata(
        &self,
        message_id: &str,
        patch: &MessageMetadata,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;
}

/// Repository trait for free-form site feedback.
pub trait FeedbackRepository: Send + Sync {
    fn save_feedback(
        &self,
        feedback: &SiteFeedback,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
