//! Chat title generation via LLM.
//!
//! `generate_chat_title` turns the first user message into a short title.
//! It never fails: any provider error or empty answer falls back to the
//! message text itself.

use morphic_types::llm::{CompletionRequest, Message};

use crate::llm::box_provider::BoxLlmProvider;

const TITLE_SYSTEM_PROMPT: &str = "You are an AI assistant specialized in creating very short, \
concise, and informative titles for chat conversations based on the user's first message. \
The title should capture the main topic or question. Keep it 3-5 words long, and no more than \
10 words. Only output the title itself, with no prefixes, labels, or quotation marks.";

const FALLBACK_TITLE: &str = "New Chat";
const FALLBACK_MAX_CHARS: usize = 75;

/// First 75 characters of the message, or "New Chat" when blank.
pub fn fallback_title(user_message: &str) -> String {
    let trimmed = user_message.trim();
    if trimmed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    trimmed.chars().take(FALLBACK_MAX_CHARS).collect::<String>().trim().to_string()
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

#[tracing::instrument(name = "generate_title", skip(provider, user_message), fields(model = %model))]
pub async fn generate_chat_title(provider: &BoxLlmProvider, model: &str, user_message: &str) -> String {
    let fallback = fallback_title(user_message);
    if user_message.trim().is_empty() {
        return fallback;
    }

    let mut request = CompletionRequest::simple(
        model,
        Some(TITLE_SYSTEM_PROMPT.to_string()),
        vec![Message::user(user_message)],
    );
    request.max_tokens = 50;
    request.temperature = Some(0.3);

    match provider.complete(&request).await {
        Ok(response) => {
            let title = clean_title(&response.content);
            if title.is_empty() { fallback } else { title }
        }
        Err(e) => {
            tracing::warn!(error = %e, "title generation failed, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[test]
    fn test_fallback_truncates_to_75_chars() {
        let long = "a".repeat(200);
        assert_eq!(fallback_title(&long).len(), 75);
        assert_eq!(fallback_title("   "), "New Chat");
        assert_eq!(fallback_title("  short question  "), "short question");
    }

    #[test]
    fn test_clean_title_strips_quotes() {
        assert_eq!(clean_title("  \"Rust Lifetimes\"  "), "Rust Lifetimes");
        assert_eq!(clean_title("'Trip Planning'"), "Trip Planning");
    }

    #[tokio::test]
    async fn test_uses_model_answer() {
        let provider = ScriptedProvider::text("p", "\"Rust Ownership Basics\"");
        let requests = provider.requests();
        let provider = BoxLlmProvider::new(provider);
        let title = generate_chat_title(&provider, "m", "How does ownership work in Rust?").await;
        assert_eq!(title, "Rust Ownership Basics");

        let requests = requests.lock().unwrap();
        assert!(requests[0].system.as_deref().unwrap().contains("3-5 words"));
        assert_eq!(requests[0].messages[0].content, "How does ownership work in Rust?");
    }

    #[tokio::test]
    async fn test_error_or_empty_answer_falls_back() {
        let failing = BoxLlmProvider::new(ScriptedProvider::failing("p"));
        assert_eq!(generate_chat_title(&failing, "m", "What is tokio?").await, "What is tokio?");

        let empty = BoxLlmProvider::new(ScriptedProvider::text("p", "  \"\" "));
        assert_eq!(generate_chat_title(&empty, "m", "What is axum?").await, "What is axum?");
    }
}
