//! Persisting a finished response.
//!
//! Runs after the stream has been fully sent. Failures are logged and never
//! propagated, so a broken database can not break a chat.

use tracing::{error, info, warn};

use morphic_types::chat::UNTITLED_CHAT;
use morphic_types::message::{MessageMetadata, UiMessage};
use morphic_types::model::SearchMode;

use crate::chat::repository::ChatRepository;
use crate::chat::service::ChatService;
use crate::retry::retry_database_operation;

#[derive(Debug, Clone)]
pub struct PersistRequest {
    pub chat_id: String,
    pub user_id: String,
    pub response: UiMessage,
    /// Generated title for new chats.
    pub title: Option<String>,
    pub trace_id: Option<String>,
    pub search_mode: Option<SearchMode>,
    pub model_id: Option<String>,
    /// Whether storing the user's message before the run succeeded.
    pub initial_save_ok: bool,
    /// The user's message, to recreate the chat when the initial save failed.
    pub initial_user_message: Option<UiMessage>,
}

/// What happened while persisting, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved,
    SavedAfterRetry,
    Failed,
}

/// Attach run metadata to a response message, keeping fields already set.
pub fn attach_metadata(
    message: &mut UiMessage,
    trace_id: Option<&str>,
    search_mode: Option<SearchMode>,
    model_id: Option<&str>,
) {
    let metadata = message.metadata.get_or_insert_with(MessageMetadata::default);
    if let Some(trace_id) = trace_id {
        metadata.trace_id = Some(trace_id.to_string());
    }
    if search_mode.is_some() {
        metadata.search_mode = search_mode;
    }
    if let Some(model_id) = model_id {
        metadata.model_id = Some(model_id.to_string());
    }
}

#[tracing::instrument(name = "persist_stream_results", skip_all, fields(chat_id = %req.chat_id))]
pub async fn persist_stream_results<R: ChatRepository>(
    service: &ChatService<R>,
    mut req: PersistRequest,
) -> PersistOutcome {
    attach_metadata(
        &mut req.response,
        req.trace_id.as_deref(),
        req.search_mode,
        req.model_id.as_deref(),
    );

    if !req.initial_save_ok {
        let Some(first) = req.initial_user_message.as_ref() else {
            error!("initial chat persistence failed and no user message to recreate it");
            return PersistOutcome::Failed;
        };
        if let Err(e) = service
            .create_chat_with_first_message(&req.chat_id, &req.user_id, first)
            .await
        {
            error!(error = %e, "fallback chat creation failed");
            return PersistOutcome::Failed;
        }
    }

    let outcome = match service.upsert_message(&req.chat_id, &req.user_id, &req.response).await {
        Ok(()) => PersistOutcome::Saved,
        Err(e) => {
            warn!(error = %e, "saving response failed, retrying");
            let retried = retry_database_operation(
                || service.upsert_message(&req.chat_id, &req.user_id, &req.response),
                "save message",
            )
            .await;
            match retried {
                Ok(()) => PersistOutcome::SavedAfterRetry,
                Err(e) => {
                    error!(error = %e, "failed to save response after retries");
                    PersistOutcome::Failed
                }
            }
        }
    };

    if let Some(title) = req.title.as_deref().filter(|t| *t != UNTITLED_CHAT)
        && let Err(e) = service.update_title(&req.chat_id, &req.user_id, title).await
    {
        warn!(error = %e, "updating chat title failed");
    }

    service.invalidate(&req.chat_id);
    info!(?outcome, "stream results persisted");
    outcome
}
