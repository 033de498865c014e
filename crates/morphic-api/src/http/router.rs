//! Axum router configuration with middleware.
//!
//! All routes are under `/api/` except `/health`.
//! Middleware: CORS, request tracing, gzip compression (SSE is exempt).

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat streaming
        .route("/chat", post(handlers::chat::post_chat))
        // History
        .route(
            "/chats",
            get(handlers::chats::list_chats).delete(handlers::chats::clear_chats),
        )
        .route(
            "/chat/{id}",
            get(handlers::chats::get_chat).delete(handlers::chats::delete_chat),
        )
        .route("/chat/{id}/share", post(handlers::chats::share_chat))
        .route("/share/{id}", get(handlers::chats::get_shared_chat))
        // Feedback
        .route("/feedback", post(handlers::feedback::post_message_feedback))
        .route("/site-feedback", post(handlers::feedback::post_site_feedback))
        // Configuration
        .route("/config/models", get(handlers::config::get_models));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use morphic_core::chat::repository::ChatRepository;
    use morphic_types::chat::{Chat, UNTITLED_CHAT, Visibility};
    use morphic_types::config::AppConfig;
    use morphic_types::message::UiMessage;

    use crate::state::AppState;
    use crate::state::testing::test_state;

    fn auth_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.features.enable_auth = true;
        config
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(method: &str, uri: &str, user: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn seed_chat(state: &AppState, id: &str, owner: &str, visibility: Visibility) {
        let repo = state.chat_service.repo();
        repo.create_chat(&Chat {
            id: id.to_string(),
            title: UNTITLED_CHAT.to_string(),
            user_id: owner.to_string(),
            visibility,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
        repo.upsert_message(id, Some(owner), &UiMessage::user_text(format!("{id}-m1"), "what is rust?"))
            .await
            .unwrap();
    }

    fn chat_body(chat_id: &str) -> serde_json::Value {
        serde_json::json!({
            "chatId": chat_id,
            "trigger": "submit-message",
            "message": {"id": "m1", "role": "user", "parts": [{"type": "text", "text": "hello"}]}
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_router(test_state(AppConfig::default()).await);
        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn models_config_is_cacheable() {
        let app = build_router(test_state(AppConfig::default()).await);
        let response = app.oneshot(get("/api/config/models", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["cache-control"], "public, max-age=60, s-maxage=60");
        let body = body_json(response).await;
        assert_eq!(body["models"]["quick"]["speed"]["id"], "gpt-5-nano");
        assert_eq!(body["enabledProviders"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn chats_page_lists_only_own_chats() {
        let state = test_state(auth_config()).await;
        seed_chat(&state, "c1", "alice", Visibility::Private).await;
        seed_chat(&state, "c2", "bob", Visibility::Private).await;
        let app = build_router(state);

        let response = app.clone().oneshot(get("/api/chats", Some("alice"))).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["chats"].as_array().unwrap().len(), 1);
        assert_eq!(body["chats"][0]["id"], "c1");
        assert!(body["nextOffset"].is_null());

        let response = app.oneshot(get("/api/chats", None)).await.unwrap();
        assert_eq!(body_json(response).await["chats"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn chats_empty_when_history_disabled() {
        let mut config = auth_config();
        config.features.save_chat_history = false;
        let state = test_state(config).await;
        seed_chat(&state, "c1", "alice", Visibility::Private).await;
        let app = build_router(state);

        let response = app.clone().oneshot(get("/api/chats", Some("alice"))).await.unwrap();
        assert_eq!(body_json(response).await["chats"], serde_json::json!([]));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/chat/c1")
                    .header("x-user-id", "alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn private_chat_hidden_from_others_until_shared() {
        let state = test_state(auth_config()).await;
        seed_chat(&state, "c1", "alice", Visibility::Private).await;
        let app = build_router(state);

        let response = app.clone().oneshot(get("/api/chat/c1", Some("bob"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], "CHAT_NOT_FOUND");

        let response = app.clone().oneshot(get("/api/share/c1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/chat/c1/share", Some("alice"), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["visibility"], "public");

        let response = app.oneshot(get("/api/share/c1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["messages"][0]["id"], "c1-m1");
    }

    #[tokio::test]
    async fn delete_chat_owned_by_other_user_is_forbidden() {
        let state = test_state(auth_config()).await;
        seed_chat(&state, "c1", "alice", Visibility::Private).await;
        let app = build_router(state);

        let delete = |user: &str| {
            Request::builder()
                .method("DELETE")
                .uri("/api/chat/c1")
                .header("x-user-id", user)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete("bob")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.clone().oneshot(delete("alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(delete("alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn message_feedback_validates_input() {
        let app = build_router(test_state(AppConfig::default()).await);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/feedback", None, serde_json::json!({"score": 1})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/feedback",
                None,
                serde_json::json!({"traceId": "t1", "score": 3}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["errors"][0]["message"],
            "score must be 1 (good) or -1 (bad)"
        );

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/feedback",
                None,
                serde_json::json!({"traceId": "t1", "score": -1, "messageId": "missing"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn site_feedback_returns_id() {
        let app = build_router(test_state(AppConfig::default()).await);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/site-feedback",
                None,
                serde_json::json!({"sentiment": "positive", "message": "love it", "pageUrl": "https://morphic.sh/"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn chat_rejected_from_share_pages() {
        let app = build_router(test_state(AppConfig::default()).await);
        let mut request = json_request("POST", "/api/chat", None, chat_body("c1"));
        request
            .headers_mut()
            .insert("referer", "https://morphic.sh/share/abc".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn guest_chat_requires_sign_in_unless_allowed() {
        let app = build_router(test_state(auth_config()).await);
        let response = app
            .oneshot(json_request("POST", "/api/chat", None, chat_body("c1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guest_limit_enforced_by_client_ip() {
        let mut config = auth_config();
        config.features.allow_guest_chat = true;
        config.features.cloud_deployment = true;
        config.rate_limit.guest_daily_limit = 1;
        let app = build_router(test_state(config).await);

        let request = || {
            let mut request = json_request("POST", "/api/chat", None, chat_body("c1"));
            request
                .headers_mut()
                .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
            request
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        drop(body_text(first).await);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(second.headers()["x-ratelimit-limit"], "1");
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(body_json(second).await["errors"][0]["message"], "Please sign in to continue.");
    }

    #[tokio::test]
    async fn quality_limit_returns_429() {
        let mut config = auth_config();
        config.features.cloud_deployment = true;
        config.rate_limit.quality_daily_limit = 1;
        let app = build_router(test_state(config).await);

        let request = |chat_id: &str| {
            let mut request = json_request("POST", "/api/chat", Some("alice"), chat_body(chat_id));
            request
                .headers_mut()
                .insert("cookie", "modelType=quality; searchMode=quick".parse().unwrap());
            request
        };

        let first = app.clone().oneshot(request("c1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        drop(body_text(first).await);

        let second = app.oneshot(request("c2")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(second).await["errors"][0]["code"], "QUALITY_LIMIT_REACHED");
    }

    #[tokio::test]
    async fn posting_to_another_users_chat_is_forbidden() {
        let state = test_state(auth_config()).await;
        seed_chat(&state, "c1", "alice", Visibility::Private).await;
        let app = build_router(state);

        let response = app
            .oneshot(json_request("POST", "/api/chat", Some("bob"), chat_body("c1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["errors"][0]["message"],
            "You are not allowed to access this chat"
        );
    }

    #[tokio::test]
    async fn ephemeral_chat_streams_error_when_no_provider_is_configured() {
        let mut config = AppConfig::default();
        config.features.save_chat_history = false;
        let app = build_router(test_state(config).await);

        let response = app
            .oneshot(json_request("POST", "/api/chat", None, chat_body("c1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["x-vercel-ai-ui-message-stream"], "v1");

        let text = body_text(response).await;
        let data: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("data: "))
            .collect();
        assert!(data[0].contains(r#""type":"start""#), "{text}");
        assert!(data.iter().any(|d| d.contains(r#""type":"error""#)), "{text}");
        assert_eq!(data.last(), Some(&"[DONE]"));
    }
}
