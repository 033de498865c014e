//! Business logic and port traits for Morphic.
//!
//! This crate defines the "ports" (repository, LLM provider, search, fetch,
//! analytics, and rate-limit counter traits) that the infrastructure layer
//! implements, plus the research agent and the chat turn pipeline built on
//! them. It depends only on `morphic-types` -- never on `morphic-infra` or
//! any database/IO crate.

pub mod agent;
pub mod analytics;
pub mod cache;
pub mod chat;
pub mod fetch;
pub mod llm;
pub mod model_selection;
pub mod rate_limit;
pub mod retry;
pub mod search;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;
