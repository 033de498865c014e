//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! Used as field names in `tracing::info_span!` around LLM calls so every
//! provider, the researcher loop and the utility generators (titles, related
//! questions) emit the same shape of span.
//!
//! Span naming convention: `"gen_ai.{operation}"`.

/// The name of the operation being performed (e.g., "chat", "research").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "openai").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// The model ID requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Number of agent steps taken by the researcher.
pub const GEN_AI_AGENT_STEPS: &str = "gen_ai.agent.steps";

/// Chat identifier the generation belongs to.
pub const MORPHIC_CHAT_ID: &str = "morphic.chat.id";

/// Search mode selected for the request ("quick", "planning", "adaptive").
pub const MORPHIC_SEARCH_MODE: &str = "morphic.search_mode";

// --- Operation name values ---

pub const OP_CHAT: &str = "chat";

/// Multi-step researcher invocation.
pub const OP_RESEARCH: &str = "research";

pub const OP_GENERATE_TITLE: &str = "generate_title";

pub const OP_RELATED_QUESTIONS: &str = "related_questions";

// --- Provider name values ---

pub const PROVIDER_OPENAI: &str = "openai";
pub const PROVIDER_ANTHROPIC: &str = "anthropic";

/// Root span for one chat turn, carrying the GenAI request attributes.
///
/// The field names mirror the constants above.
pub fn chat_span(provider: &str, model: &str, chat_id: &str, search_mode: &str) -> tracing::Span {
    tracing::info_span!(
        "gen_ai.chat",
        gen_ai.operation.name = OP_CHAT,
        gen_ai.provider.name = provider,
        gen_ai.request.model = model,
        morphic.chat.id = chat_id,
        morphic.search_mode = search_mode,
    )
}
