//! GET /api/config/models - model assignments and enabled providers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

pub async fn get_models(State(state): State<AppState>) -> Response {
    let body = json!({
        "models": state.models.as_ref(),
        "enabledProviders": state.providers().list_names(),
    });

    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=60, s-maxage=60"),
    );
    response
}
