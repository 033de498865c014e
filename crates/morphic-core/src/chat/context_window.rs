//! Context window budgeting for model input.
//!
//! Token counts are approximated by content length in characters.

use morphic_types::llm::{Message, MessageRole};

const DEFAULT_CONTEXT_WINDOW: usize = 128_000;
const DEFAULT_RESERVE_TOKENS: usize = 30_000;

/// Tokens available for history after reserving room for the answer.
pub fn max_allowed_tokens(model_id: &str) -> usize {
    let (window, reserve) = if model_id.contains("deepseek") {
        (64_000, 27_000)
    } else if model_id.contains("claude") {
        (200_000, 40_000)
    } else {
        (DEFAULT_CONTEXT_WINDOW, DEFAULT_RESERVE_TOKENS)
    };
    window - reserve
}

fn message_size(message: &Message) -> usize {
    message.content.len()
}

pub fn should_truncate(messages: &[Message], model_id: &str) -> bool {
    messages.iter().map(message_size).sum::<usize>() > max_allowed_tokens(model_id)
}

/// Keep the longest suffix of `messages` that fits in `max_tokens`, then
/// drop leading messages until the first user message.
pub fn truncate_messages(messages: &[Message], max_tokens: usize) -> Vec<Message> {
    let mut total = 0;
    let mut kept = Vec::new();

    for message in messages.iter().rev() {
        let size = message_size(message);
        if total + size > max_tokens {
            break;
        }
        total += size;
        kept.push(message.clone());
    }
    kept.reverse();

    let first_user = kept
        .iter()
        .position(|m| m.role == MessageRole::User)
        .unwrap_or(kept.len());
    kept.split_off(first_user)
}
