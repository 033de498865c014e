//! Application error type mapping to HTTP status codes and the error envelope.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use morphic_types::error::{ChatError, RepositoryError};
use morphic_types::rate_limit::{LimitKind, RateLimitDecision};

use crate::http::response::ErrorEnvelope;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Repository(RepositoryError),
    /// A daily budget is exhausted.
    RateLimited { kind: LimitKind, decision: RateLimitDecision },
    /// No identity on a route that needs one.
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

fn repository_status(e: &RepositoryError) -> (StatusCode, &'static str, String) {
    match e {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string()),
        RepositoryError::RlsViolation(_) => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "You are not allowed to access this chat".to_string(),
        ),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        other => {
            tracing::error!(error = %other, "repository error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            )
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::NotFound) => (StatusCode::NOT_FOUND, "CHAT_NOT_FOUND", "Chat not found".to_string()),
            AppError::Chat(ChatError::MessageNotFound) => {
                (StatusCode::NOT_FOUND, "MESSAGE_NOT_FOUND", "Message not found".to_string())
            }
            AppError::Chat(ChatError::Forbidden) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You are not allowed to access this chat".to_string(),
            ),
            AppError::Chat(ChatError::HistoryDisabled) => (
                StatusCode::FORBIDDEN,
                "HISTORY_DISABLED",
                "Chat history saving is disabled.".to_string(),
            ),
            AppError::Chat(ChatError::InvalidRequest(msg)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Chat(ChatError::Repository(e)) | AppError::Repository(e) => repository_status(e),
            AppError::RateLimited { kind: LimitKind::GuestChat, .. } => (
                StatusCode::UNAUTHORIZED,
                "GUEST_LIMIT_REACHED",
                "Please sign in to continue.".to_string(),
            ),
            AppError::RateLimited { kind: LimitKind::QualityChat, decision } => (
                StatusCode::TOO_MANY_REQUESTS,
                "QUALITY_LIMIT_REACHED",
                format!("Daily limit of {} quality requests reached.", decision.limit),
            ),
            AppError::RateLimited { decision, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Daily limit of {} requests reached.", decision.limit),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let details = match &self {
            AppError::RateLimited { decision, .. } => Some(json!({
                "limit": decision.limit,
                "remaining": 0,
                "resetAt": decision.reset_at,
            })),
            _ => None,
        };

        let mut response = (status, axum::Json(ErrorEnvelope::single(code, message, details))).into_response();

        if let AppError::RateLimited { decision, .. } = &self {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at));
        }
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}
