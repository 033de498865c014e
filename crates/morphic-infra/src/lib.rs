//! Infrastructure layer for Morphic.
//!
//! Contains implementations of the ports defined in `morphic-core`: SQLite
//! chat and feedback repositories, the Redis rate-limit counter store, LLM
//! provider clients (OpenAI-compatible and Anthropic), web search providers,
//! page fetchers, the analytics sink, the Slack feedback notifier, and
//! configuration loading.

pub mod analytics;
pub mod config;
pub mod fetch;
pub mod llm;
pub mod redis;
pub mod search;
pub mod slack;
pub mod sqlite;
