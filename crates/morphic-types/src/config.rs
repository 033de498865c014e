//! Application configuration types for Morphic.
//!
//! `AppConfig` represents `config.toml` in the data directory. Every section
//! and field has a default, so an empty file (or none at all) is valid.
//! Environment variables are overlaid on top by the infra loader.

use serde::{Deserialize, Serialize};

use crate::search::{SearchDepth, SearchProviderKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat cache sizing. Out-of-range values are clamped by [`CacheSettings::effective`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

const MIN_CACHE_TTL: u64 = 10;
const MAX_CACHE_TTL: u64 = 3600;
const MIN_CACHE_ENTRIES: usize = 100;
const MAX_CACHE_ENTRIES: usize = 10_000;

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheSettings {
    /// TTL clamped to 10s..=1h and capacity clamped to 100..=10000.
    pub fn effective(&self) -> Self {
        Self {
            ttl_secs: self.ttl_secs.clamp(MIN_CACHE_TTL, MAX_CACHE_TTL),
            max_entries: self.max_entries.clamp(MIN_CACHE_ENTRIES, MAX_CACHE_ENTRIES),
            sweep_interval_secs: self.sweep_interval_secs.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_chat_limit")]
    pub chat_daily_limit: u64,
    #[serde(default = "default_quality_limit")]
    pub quality_daily_limit: u64,
    #[serde(default = "default_guest_limit")]
    pub guest_daily_limit: u64,
}

fn default_chat_limit() -> u64 {
    100
}

fn default_quality_limit() -> u64 {
    5
}

pub const DEFAULT_GUEST_DAILY_LIMIT: u64 = 10;

fn default_guest_limit() -> u64 {
    DEFAULT_GUEST_DAILY_LIMIT
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            chat_daily_limit: default_chat_limit(),
            quality_daily_limit: default_quality_limit(),
            guest_daily_limit: default_guest_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    /// Hosted deployment: enables rate limits and analytics.
    #[serde(default)]
    pub cloud_deployment: bool,
    #[serde(default = "default_true")]
    pub save_chat_history: bool,
    /// When false every request acts as `anonymous_user_id`.
    #[serde(default)]
    pub enable_auth: bool,
    #[serde(default = "default_anonymous_user_id")]
    pub anonymous_user_id: String,
    /// Header carrying the authenticated user id, set by the auth proxy.
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,
    /// Allow unauthenticated users to chat without persistence.
    #[serde(default)]
    pub allow_guest_chat: bool,
}

fn default_true() -> bool {
    true
}

fn default_anonymous_user_id() -> String {
    "anonymous-user".to_string()
}

fn default_user_id_header() -> String {
    "x-user-id".to_string()
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            cloud_deployment: false,
            save_chat_history: true,
            enable_auth: false,
            anonymous_user_id: default_anonymous_user_id(),
            user_id_header: default_user_id_header(),
            allow_guest_chat: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// `STORAGE_PROVIDER=none` turns Redis off entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub provider: SearchProviderKind,
    #[serde(default)]
    pub searxng_api_url: Option<String>,
    /// Forces a depth for SearXNG regardless of what the model asked for.
    #[serde(default)]
    pub searxng_default_depth: Option<SearchDepth>,
}
