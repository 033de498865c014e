//! Caller identity.
//!
//! The auth gateway in front of the API authenticates users and forwards the
//! user id in a trusted header (`x-user-id` unless configured otherwise).
//! With auth disabled every caller is the configured anonymous user.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

/// The caller: a user id, or `None` for an unauthenticated guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
}

impl Identity {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    /// The user id, or 401 for guests.
    pub fn require_user(&self) -> Result<&str, AppError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let features = &state.config.features;
        if !features.enable_auth {
            return Ok(Identity {
                user_id: Some(features.anonymous_user_id.clone()),
            });
        }

        let user_id = parts
            .headers
            .get(features.user_id_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Identity { user_id })
    }
}

/// Client IP from `x-forwarded-for` (first hop), then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded.or_else(real).map(str::to_string)
}
