//! Shared domain types for Morphic.
//!
//! Chats, UI messages and their parts, the UI stream chunk protocol, LLM
//! request/response shapes, search results and tool inputs, model
//! configuration, rate-limit decisions, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror, schemars.

pub mod chat;
pub mod config;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod message;
pub mod model;
pub mod rate_limit;
pub mod search;
pub mod stream;
pub mod todo;
