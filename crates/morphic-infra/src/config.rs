//! Configuration loading for Morphic.
//!
//! Reads `config.toml` and `models.toml` from the data directory
//! (`~/.morphic/` unless `MORPHIC_DATA_DIR` is set), falling back to
//! defaults when a file is missing or malformed, then overlays environment
//! variables. Provider API keys are only ever read from the environment and
//! are held as [`SecretString`]s.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::de::DeserializeOwned;

use morphic_types::config::{AppConfig, DEFAULT_GUEST_DAILY_LIMIT};
use morphic_types::model::ModelsConfig;

/// Resolve the data directory: `MORPHIC_DATA_DIR`, else `$HOME/.morphic`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MORPHIC_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".morphic")
}

async fn load_toml<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} found, using defaults", path.display());
            return T::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return T::default();
        }
    };

    match toml::from_str::<T>(&content) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            T::default()
        }
    }
}

/// Load `{data_dir}/config.toml` and overlay the process environment.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let mut config: AppConfig = load_toml(&data_dir.join("config.toml")).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Load `{data_dir}/models.toml`, or the built-in model assignments.
pub async fn load_models_config(data_dir: &Path) -> ModelsConfig {
    load_toml(&data_dir.join("models.toml")).await
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// A positive integer, or `None` for anything else.
fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<i64>().ok().filter(|n| *n > 0).map(|n| n as u64)
}

/// Overlay environment variables, read through `env`, onto `config`.
pub fn apply_env_overrides(config: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(ttl) = env("CHAT_CACHE_TTL").as_deref().and_then(parse_positive) {
        config.cache.ttl_secs = ttl;
    }
    if let Some(max) = env("CHAT_CACHE_MAX_ENTRIES").as_deref().and_then(parse_positive) {
        config.cache.max_entries = max as usize;
    }

    if let Some(limit) = env("CHAT_DAILY_LIMIT").as_deref().and_then(parse_positive) {
        config.rate_limit.chat_daily_limit = limit;
    }
    if let Some(limit) = env("QUALITY_CHAT_DAILY_LIMIT").as_deref().and_then(parse_positive) {
        config.rate_limit.quality_daily_limit = limit;
    }
    if let Some(raw) = env("GUEST_CHAT_DAILY_LIMIT") {
        config.rate_limit.guest_daily_limit = parse_positive(&raw).unwrap_or(DEFAULT_GUEST_DAILY_LIMIT);
    }

    if let Some(v) = env("MORPHIC_CLOUD_DEPLOYMENT") {
        config.features.cloud_deployment = parse_flag(&v);
    }
    if let Some(v) = env("ENABLE_SAVE_CHAT_HISTORY") {
        config.features.save_chat_history = parse_flag(&v);
    }
    if let Some(v) = env("ENABLE_AUTH") {
        config.features.enable_auth = parse_flag(&v);
    }
    if let Some(v) = env("ANONYMOUS_USER_ID").filter(|v| !v.trim().is_empty()) {
        config.features.anonymous_user_id = v;
    }
    if let Some(v) = env("ALLOW_GUEST_CHAT") {
        config.features.allow_guest_chat = parse_flag(&v);
    }

    if let Some(v) = env("SEARCH_API") {
        match v.parse() {
            Ok(kind) => config.search.provider = kind,
            Err(e) => tracing::warn!("Ignoring SEARCH_API: {e}"),
        }
    }
    if let Some(v) = env("SEARXNG_API_URL").filter(|v| !v.is_empty()) {
        config.search.searxng_api_url = Some(v.trim_end_matches('/').to_string());
    }
    if let Some(v) = env("SEARXNG_DEFAULT_DEPTH") {
        config.search.searxng_default_depth = v.parse().ok();
    }

    if let Some(v) = env("REDIS_URL").filter(|v| !v.is_empty()) {
        config.redis.url = Some(v);
    }
    if let Some(v) = env("REDIS_USERNAME").filter(|v| !v.is_empty()) {
        config.redis.username = Some(v);
    }
    if env("STORAGE_PROVIDER").is_some_and(|v| v.eq_ignore_ascii_case("none")) {
        config.redis.enabled = false;
    }
}

/// API keys and endpoints for every external service.
///
/// Does not derive Debug; each field is either a secret or an endpoint that
/// is only meaningful next to one.
#[derive(Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<SecretString>,
    pub anthropic_api_key: Option<SecretString>,
    pub google_api_key: Option<SecretString>,
    pub groq_api_key: Option<SecretString>,
    pub ollama_base_url: Option<String>,
    pub openai_compatible_api_key: Option<SecretString>,
    pub openai_compatible_base_url: Option<String>,
    pub tavily_api_key: Option<SecretString>,
    pub brave_api_key: Option<SecretString>,
    pub exa_api_key: Option<SecretString>,
    pub firecrawl_api_key: Option<SecretString>,
    pub serper_api_key: Option<SecretString>,
    pub jina_api_key: Option<SecretString>,
    pub redis_password: Option<SecretString>,
    pub slack_webhook_url: Option<SecretString>,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup; empty values count as unset.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| value(key).map(SecretString::from);

        Self {
            openai_api_key: secret("OPENAI_API_KEY"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            google_api_key: secret("GOOGLE_GENERATIVE_AI_API_KEY"),
            groq_api_key: secret("GROQ_API_KEY"),
            ollama_base_url: value("OLLAMA_BASE_URL"),
            openai_compatible_api_key: secret("OPENAI_COMPATIBLE_API_KEY"),
            openai_compatible_base_url: value("OPENAI_COMPATIBLE_API_BASE_URL"),
            tavily_api_key: secret("TAVILY_API_KEY"),
            brave_api_key: secret("BRAVE_SEARCH_API_KEY"),
            exa_api_key: secret("EXA_API_KEY"),
            firecrawl_api_key: secret("FIRECRAWL_API_KEY"),
            serper_api_key: secret("SERPER_API_KEY"),
            jina_api_key: secret("JINA_API_KEY"),
            redis_password: secret("REDIS_PASSWORD"),
            slack_webhook_url: secret("SLACK_WEBHOOK_URL"),
        }
    }
}
