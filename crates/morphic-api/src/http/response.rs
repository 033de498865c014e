//! Error envelope shared by every failing API response.
//!
//! ```json
//! {
//!   "data": null,
//!   "meta": { "request_id": "...", "timestamp": "..." },
//!   "errors": [{ "code": "NOT_FOUND", "message": "...", "details": {...} }]
//! }
//! ```
//!
//! Successful responses carry the bare JSON body the web client expects.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// Always `null`; present so clients can branch on one shape.
    pub data: Option<()>,
    pub meta: ApiMeta,
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn single(code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            data: None,
            meta: ApiMeta {
                request_id: uuid::Uuid::now_v7().to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details,
            }],
        }
    }
}
