//! SSE streaming chat endpoint.
//!
//! POST /api/chat
//!
//! Resolves the model from the search mode and model type, enforces the
//! daily budgets, then streams UI message chunks as `data:` JSON lines
//! terminated by `data: [DONE]`. Signed-in users with history enabled get
//! the persisted flow; guests and history-disabled deployments get the
//! ephemeral flow over client-supplied messages.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::Instrument;

use morphic_core::analytics::{ChatMessageEvent, conversation_turn};
use morphic_core::chat::stream::{
    ChatTurn, EphemeralTurn, UiChunkStream, create_chat_stream, create_ephemeral_stream,
};
use morphic_core::model_selection::select_model;
use morphic_observe::genai_attrs::chat_span;
use morphic_types::chat::ChatTrigger;
use morphic_types::message::UiMessage;
use morphic_types::model::{ModelConfig, ModelType, SearchMode};
use morphic_types::rate_limit::LimitKind;

use crate::http::error::AppError;
use crate::http::extractors::identity::{Identity, client_ip};
use crate::state::AppState;

const SEARCH_MODE_COOKIE: &str = "searchMode";
const MODEL_TYPE_COOKIE: &str = "modelType";
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The submitted (or edited) user message.
    pub message: Option<UiMessage>,
    /// Full client-side history, used by the ephemeral flow.
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub trigger: ChatTrigger,
    /// Target of a regenerate.
    pub message_id: Option<String>,
    #[serde(default)]
    pub is_new_chat: bool,
    pub search_mode: Option<SearchMode>,
}

/// POST /api/chat
pub async fn post_chat(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    if referer.is_some_and(|r| r.contains("/share/")) {
        return Err(AppError::Forbidden(
            "Chat API is not available on share pages".to_string(),
        ));
    }
    if body.chat_id.trim().is_empty() {
        return Err(AppError::Validation("chatId is required".to_string()));
    }

    let requested_mode = body
        .search_mode
        .or_else(|| jar.get(SEARCH_MODE_COOKIE).and_then(|c| c.value().parse().ok()));
    let model_type: Option<ModelType> = jar.get(MODEL_TYPE_COOKIE).and_then(|c| c.value().parse().ok());
    let model = select_model(&state.models, requested_mode, model_type, |p| {
        state.providers().is_enabled(p)
    });
    let search_mode = requested_mode.unwrap_or_default();

    let span = chat_span(&model.provider_id, &model.id, &body.chat_id, &search_mode.to_string());
    start_turn(state, identity, headers, body, model, model_type, search_mode)
        .instrument(span)
        .await
}

async fn start_turn(
    state: AppState,
    identity: Identity,
    headers: HeaderMap,
    body: ChatRequest,
    model: ModelConfig,
    model_type: Option<ModelType>,
    search_mode: SearchMode,
) -> Result<Response, AppError> {
    enforce_rate_limits(&state, &identity, model_type, &headers).await?;

    let trace_id = uuid::Uuid::now_v7().to_string();
    let analytics_user = identity.user_id.clone().unwrap_or_else(|| "guest".to_string());
    let mut event = ChatMessageEvent {
        search_mode,
        model_type,
        conversation_turn: 1,
        is_new_chat: body.is_new_chat,
        trigger: trigger_name(body.trigger).to_string(),
        chat_id: body.chat_id.clone(),
        user_id: analytics_user,
        model_id: model.qualified_id(),
    };

    let persisted_user = identity
        .user_id
        .clone()
        .filter(|_| state.config.features.save_chat_history);

    let chunks: UiChunkStream = match persisted_user {
        Some(user_id) => {
            let existing = state.chat_service.authorize_post(&body.chat_id, &user_id).await?;

            let mut history: Vec<UiMessage> = existing.as_ref().map(|c| c.messages.clone()).unwrap_or_default();
            history.extend(body.message.clone());
            event.conversation_turn = conversation_turn(&history);
            event.is_new_chat = event.is_new_chat || existing.is_none();
            track(&state, event);

            tracing::info!(trigger = ?body.trigger, new_chat = existing.is_none(), "chat turn accepted");
            create_chat_stream(
                state.chat_service.clone(),
                state.research.clone(),
                ChatTurn {
                    chat_id: body.chat_id,
                    user_id,
                    trigger: body.trigger,
                    message_id: body.message_id,
                    message: body.message,
                    existing,
                    model,
                    search_mode,
                    trace_id,
                },
            )
        }
        None => {
            let messages = if body.messages.is_empty() {
                body.message.into_iter().collect()
            } else {
                body.messages
            };
            event.conversation_turn = conversation_turn(&messages);
            track(&state, event);

            tracing::info!(messages = messages.len(), "ephemeral chat turn accepted");
            create_ephemeral_stream(
                state.research.clone(),
                EphemeralTurn {
                    messages,
                    model,
                    search_mode,
                    trace_id,
                },
            )?
        }
    };

    Ok(sse_response(chunks))
}

fn trigger_name(trigger: ChatTrigger) -> &'static str {
    match trigger {
        ChatTrigger::SubmitMessage => "submit-message",
        ChatTrigger::RegenerateAssistantMessage => "regenerate-assistant-message",
    }
}

/// Check the caller's daily budgets.
///
/// Signed-in users draw from the overall budget, plus the quality budget
/// when they picked the quality model type. Guests draw from the guest
/// budget keyed by client IP; a guest without a resolvable IP is allowed.
async fn enforce_rate_limits(
    state: &AppState,
    identity: &Identity,
    model_type: Option<ModelType>,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    let limiter = &state.rate_limiter;

    let Some(user_id) = identity.user_id.as_deref() else {
        if !state.config.features.allow_guest_chat {
            return Err(AppError::Unauthorized("Please sign in to continue.".to_string()));
        }
        let Some(ip) = client_ip(headers) else {
            tracing::debug!("guest request without client ip, skipping guest limit");
            return Ok(());
        };
        let decision = limiter.check(LimitKind::GuestChat, &ip).await;
        if !decision.allowed {
            return Err(AppError::RateLimited {
                kind: LimitKind::GuestChat,
                decision,
            });
        }
        return Ok(());
    };

    let decision = limiter.check(LimitKind::Chat, user_id).await;
    if !decision.allowed {
        tracing::info!(limit = decision.limit, "daily chat limit reached");
        return Err(AppError::RateLimited {
            kind: LimitKind::Chat,
            decision,
        });
    }

    if model_type == Some(ModelType::Quality) {
        let decision = limiter.check(LimitKind::QualityChat, user_id).await;
        if !decision.allowed {
            tracing::info!(limit = decision.limit, "daily quality limit reached");
            return Err(AppError::RateLimited {
                kind: LimitKind::QualityChat,
                decision,
            });
        }
    }
    Ok(())
}

/// Record the analytics event off the request path.
fn track(state: &AppState, event: ChatMessageEvent) {
    let analytics = state.analytics.clone();
    tokio::spawn(async move { analytics.track_chat_message(event).await });
}

/// Frame UI chunks as SSE `data:` lines followed by `[DONE]`.
fn sse_response(chunks: UiChunkStream) -> Response {
    let events = chunks
        .map(|chunk| Event::default().json_data(&chunk))
        .chain(futures_util::stream::once(async { Ok(Event::default().data("[DONE]")) }));

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
        .into_response();
    let headers = response.headers_mut();
    headers.insert("x-vercel-ai-ui-message-stream", HeaderValue::from_static("v1"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
