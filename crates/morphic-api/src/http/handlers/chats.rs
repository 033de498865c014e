//! Chat history endpoints.
//!
//! - GET    /api/chats              - Page of the caller's chats
//! - DELETE /api/chats              - Delete all of the caller's chats
//! - GET    /api/chat/{id}          - A chat with its messages
//! - DELETE /api/chat/{id}          - Delete a chat
//! - POST   /api/chat/{id}/share    - Make a chat public
//! - GET    /api/share/{id}         - A public chat

use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::{Value, json};

use morphic_types::chat::{Chat, ChatPage, ChatWithMessages};
use morphic_types::error::ChatError;

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::http::extractors::query::ChatListQuery;
use crate::state::AppState;

fn require_history(state: &AppState) -> Result<(), AppError> {
    if state.config.features.save_chat_history {
        Ok(())
    } else {
        Err(ChatError::HistoryDisabled.into())
    }
}

/// GET /api/chats - empty when history is disabled or the caller is a guest.
pub async fn list_chats(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ChatListQuery>,
) -> Result<Json<ChatPage>, AppError> {
    let Some(user_id) = identity.user_id.as_deref().filter(|_| state.config.features.save_chat_history) else {
        return Ok(Json(ChatPage {
            chats: Vec::new(),
            next_offset: None,
        }));
    };

    let page = state
        .chat_service
        .get_chats_page(user_id, query.limit(), query.offset())
        .await?;
    Ok(Json(page))
}

/// DELETE /api/chats
pub async fn clear_chats(State(state): State<AppState>, identity: Identity) -> Result<Json<Value>, AppError> {
    require_history(&state)?;
    let user_id = identity.require_user()?;
    let deleted = state.chat_service.clear_chats(user_id).await?;
    Ok(Json(json!({ "ok": true, "deleted": deleted })))
}

/// GET /api/chat/{id}
///
/// Guests can only read public chats.
pub async fn get_chat(
    State(state): State<AppState>,
    identity: Identity,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatWithMessages>, AppError> {
    require_history(&state)?;
    let chat = match identity.user_id.as_deref() {
        Some(user_id) => state.chat_service.get_chat_with_messages(&chat_id, user_id).await?,
        None => state.chat_service.get_shared_chat(&chat_id).await?,
    };
    chat.map(Json).ok_or_else(|| ChatError::NotFound.into())
}

/// DELETE /api/chat/{id}
pub async fn delete_chat(
    State(state): State<AppState>,
    identity: Identity,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_history(&state)?;
    let user_id = identity.require_user()?;
    state.chat_service.delete_chat(&chat_id, user_id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /api/chat/{id}/share
pub async fn share_chat(
    State(state): State<AppState>,
    identity: Identity,
    Path(chat_id): Path<String>,
) -> Result<Json<Chat>, AppError> {
    require_history(&state)?;
    let user_id = identity.require_user()?;
    let chat = state.chat_service.share_chat(&chat_id, user_id).await?;
    Ok(Json(chat))
}

/// GET /api/share/{id}
pub async fn get_shared_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatWithMessages>, AppError> {
    state
        .chat_service
        .get_shared_chat(&chat_id)
        .await?
        .map(Json)
        .ok_or_else(|| ChatError::NotFound.into())
}
