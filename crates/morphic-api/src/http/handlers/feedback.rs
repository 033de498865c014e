//! Feedback endpoints.
//!
//! - POST /api/feedback       - Thumbs up/down on an answer
//! - POST /api/site-feedback  - Free-form site feedback

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use serde::Deserialize;
use serde_json::{Value, json};

use morphic_core::chat::feedback::NewFeedback;
use morphic_types::feedback::{FeedbackScore, Sentiment};

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFeedbackRequest {
    pub trace_id: Option<String>,
    pub score: Option<i64>,
    pub comment: Option<String>,
    pub message_id: Option<String>,
}

/// POST /api/feedback
///
/// The score is stored on the message when `messageId` is given; a failed
/// update is logged and the request still succeeds.
pub async fn post_message_feedback(
    State(state): State<AppState>,
    Json(body): Json<MessageFeedbackRequest>,
) -> Result<Json<Value>, AppError> {
    let trace_id = body
        .trace_id
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("traceId is required".to_string()))?;
    let score = body
        .score
        .ok_or_else(|| "score must be 1 (good) or -1 (bad)".to_string())
        .and_then(FeedbackScore::try_from)
        .map_err(AppError::Validation)?;

    tracing::info!(
        trace_id,
        score = score.as_i8(),
        has_comment = body.comment.is_some(),
        "message feedback received"
    );

    if let Some(message_id) = body.message_id.as_deref() {
        match state.chat_service.update_message_feedback(message_id, score).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(message_id, "feedback for unknown message"),
            Err(e) => tracing::warn!(message_id, error = %e, "failed to store message feedback"),
        }
    }

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFeedbackRequest {
    pub sentiment: Sentiment,
    pub message: String,
    pub page_url: String,
}

/// POST /api/site-feedback
pub async fn post_site_feedback(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
    Json(body): Json<SiteFeedbackRequest>,
) -> Result<Json<Value>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message is required".to_string()));
    }

    // The anonymous stand-in id is not a real user.
    let user_id = identity.user_id.filter(|_| state.config.features.enable_auth);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let feedback = state
        .feedback_service
        .save_site_feedback(
            user_id.as_deref(),
            NewFeedback {
                sentiment: body.sentiment,
                message: body.message,
                page_url: body.page_url,
                user_agent,
            },
        )
        .await?;

    Ok(Json(json!({ "success": true, "id": feedback.id })))
}
