//! Research agent for Morphic.
//!
//! - `Researcher`: multi-step tool loop streaming UI chunks
//! - `tools`: search, fetch, todo and clarifying-question tools
//! - `prompts`: per-mode system prompts
//! - `title` / `related`: auxiliary LLM calls for chat titles and follow-up questions

pub mod prompts;
pub mod related;
pub mod researcher;
pub mod title;
pub mod tools;

pub use researcher::{ResearchEvent, ResearchOutcome, ResearchStop, Researcher};
