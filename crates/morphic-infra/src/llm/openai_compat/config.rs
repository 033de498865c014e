//! Configuration types and per-provider defaults for OpenAI-compatible providers.
//!
//! Each backend that speaks the OpenAI chat completions protocol gets a
//! factory returning an [`OpenAiCompatConfig`] with its base URL,
//! capabilities and quirks.

use secrecy::SecretString;

use morphic_types::llm::ProviderCapabilities;

/// Configuration for an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Registry key of the provider (e.g., "openai", "google").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// Bearer token. Local servers such as Ollama take none.
    pub api_key: Option<SecretString>,
    pub capabilities: ProviderCapabilities,
    /// Split `<think>...</think>` spans out of the text stream into
    /// reasoning deltas (DeepSeek R1 style models served by Groq or Ollama).
    pub extract_think_tags: bool,
    /// Send `max_completion_tokens` instead of the legacy `max_tokens`.
    pub max_completion_tokens_param: bool,
}

fn capabilities(reasoning: bool, max_context_tokens: u32, max_output_tokens: u32) -> ProviderCapabilities {
    ProviderCapabilities {
        streaming: true,
        tool_calling: true,
        reasoning,
        max_context_tokens,
        max_output_tokens,
    }
}

/// OpenAI: `https://api.openai.com/v1`.
pub fn openai_defaults(api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key: Some(api_key),
        capabilities: capabilities(true, 400_000, 128_000),
        extract_think_tags: false,
        max_completion_tokens_param: true,
    }
}

/// Google Gemini through its OpenAI-compatible endpoint.
pub fn google_defaults(api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "google".into(),
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        api_key: Some(api_key),
        capabilities: capabilities(true, 1_000_000, 65_536),
        extract_think_tags: false,
        max_completion_tokens_param: false,
    }
}

/// Groq: `https://api.groq.com/openai/v1`.
pub fn groq_defaults(api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "groq".into(),
        base_url: "https://api.groq.com/openai/v1".into(),
        api_key: Some(api_key),
        capabilities: capabilities(true, 128_000, 32_768),
        extract_think_tags: true,
        max_completion_tokens_param: false,
    }
}

/// Ollama's OpenAI-compatible API under `{base_url}/v1`.
pub fn ollama_defaults(base_url: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "ollama".into(),
        base_url: format!("{}/v1", base_url.trim_end_matches('/')),
        api_key: None,
        capabilities: capabilities(true, 128_000, 8_192),
        extract_think_tags: true,
        max_completion_tokens_param: false,
    }
}

/// Any other endpoint speaking the protocol.
pub fn compatible_defaults(api_key: SecretString, base_url: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai-compatible".into(),
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: Some(api_key),
        capabilities: capabilities(false, 128_000, 8_192),
        extract_think_tags: false,
        max_completion_tokens_param: false,
    }
}
