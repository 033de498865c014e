//! Anthropic Claude LLM provider implementation.
//!
//! [`AnthropicProvider`] implements
//! [`LlmProvider`](morphic_core::llm::provider::LlmProvider) for the
//! Anthropic Messages API, including tool use and SSE streaming.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicProvider;
