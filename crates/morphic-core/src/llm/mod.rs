//! LLM provider abstractions for Morphic.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ProviderRegistry`: name-indexed set of enabled providers

pub mod box_provider;
pub mod provider;
pub mod registry;
