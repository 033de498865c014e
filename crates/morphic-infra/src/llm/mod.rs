//! LLM provider implementations for Morphic.
//!
//! Two wire protocols cover every supported backend:
//! - [`anthropic::AnthropicProvider`] for the Anthropic Messages API
//! - [`openai_compat::OpenAiCompatibleProvider`] for OpenAI and every
//!   backend exposing an OpenAI-compatible endpoint (Google, Groq, Ollama,
//!   custom gateways)
//!
//! [`build_provider_registry`] registers exactly the providers whose
//! credentials are configured.

pub mod anthropic;
pub mod openai_compat;

use std::time::Duration;

use morphic_core::llm::box_provider::BoxLlmProvider;
use morphic_core::llm::registry::ProviderRegistry;
use morphic_types::llm::LlmError;

use crate::config::ProviderCredentials;

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{
    compatible_defaults, google_defaults, groq_defaults, ollama_defaults, openai_defaults,
};

/// Upper bound on a single generation, streaming included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared HTTP client settings for LLM providers.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a transport failure to an [`LlmError`].
pub(crate) fn request_error(e: reqwest::Error) -> LlmError {
    LlmError::Provider {
        message: format!("HTTP request failed: {e}"),
    }
}

/// Map a non-success HTTP status to an [`LlmError`].
///
/// `retry_after` is the raw `retry-after` header (seconds).
pub(crate) fn status_error(status: u16, retry_after: Option<&str>, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: retry_after
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|secs| (secs * 1000.0) as u64),
        },
        503 | 529 => LlmError::Overloaded(body),
        400 | 404 | 422 => LlmError::InvalidRequest(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Pass a successful response through, or turn its status into an error.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %body, "LLM provider returned error status");
    Err(status_error(status.as_u16(), retry_after.as_deref(), body))
}

pub(crate) fn require_model(model: &str) -> Result<(), LlmError> {
    if model.trim().is_empty() {
        return Err(LlmError::InvalidRequest("model id is required".to_string()));
    }
    Ok(())
}

/// Register every provider whose credentials are present.
///
/// Registry keys match the `providerId` values used in model configuration:
/// `openai`, `anthropic`, `google`, `groq`, `ollama`, `openai-compatible`.
pub fn build_provider_registry(credentials: &ProviderCredentials) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    if let Some(key) = &credentials.openai_api_key {
        register_compat(&mut registry, openai_defaults(key.clone()));
    }
    if let Some(key) = &credentials.anthropic_api_key {
        registry.register("anthropic", BoxLlmProvider::new(AnthropicProvider::new(key.clone())));
    }
    if let Some(key) = &credentials.google_api_key {
        register_compat(&mut registry, google_defaults(key.clone()));
    }
    if let Some(key) = &credentials.groq_api_key {
        register_compat(&mut registry, groq_defaults(key.clone()));
    }
    if let Some(base_url) = &credentials.ollama_base_url {
        register_compat(&mut registry, ollama_defaults(base_url));
    }
    if let (Some(key), Some(base_url)) = (
        &credentials.openai_compatible_api_key,
        &credentials.openai_compatible_base_url,
    ) {
        register_compat(&mut registry, compatible_defaults(key.clone(), base_url));
    }

    tracing::info!(providers = ?registry.list_names(), "LLM providers registered");
    registry
}

fn register_compat(registry: &mut ProviderRegistry, config: openai_compat::config::OpenAiCompatConfig) {
    let name = config.provider_name.clone();
    registry.register(name, BoxLlmProvider::new(OpenAiCompatibleProvider::new(config)));
}
