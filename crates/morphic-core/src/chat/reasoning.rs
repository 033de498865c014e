//! Reasoning part filters applied to history before it reaches a model.

use morphic_types::message::{MessageRole, UiMessage};

/// Remove every reasoning part from every message.
pub fn filter_reasoning_parts(messages: &[UiMessage]) -> Vec<UiMessage> {
    messages
        .iter()
        .map(|m| {
            let mut m = m.clone();
            m.parts.retain(|p| !p.is_reasoning());
            m
        })
        .collect()
}

/// Remove reasoning parts from assistant messages, keeping a message
/// untouched when it holds nothing but reasoning.
///
/// OpenAI rejects reasoning items that are not followed by their output item,
/// so history sent to OpenAI models goes through this first.
pub fn strip_reasoning_parts(messages: &[UiMessage]) -> Vec<UiMessage> {
    messages
        .iter()
        .map(|m| {
            if m.role != MessageRole::Assistant {
                return m.clone();
            }
            let parts: Vec<_> = m.parts.iter().filter(|p| !p.is_reasoning()).cloned().collect();
            if parts.is_empty() {
                return m.clone();
            }
            UiMessage {
                parts,
                ..m.clone()
            }
        })
        .collect()
}
