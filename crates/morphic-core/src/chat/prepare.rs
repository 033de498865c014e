//! Message preparation before a research run.
//!
//! Submitting appends the user's message to the stored history.
//! Regenerating rewinds the history to the targeted message and, for an
//! edited user message, stores the edit first.

use uuid::Uuid;

use morphic_types::chat::{ChatTrigger, ChatWithMessages};
use morphic_types::error::ChatError;
use morphic_types::message::{MessageRole, UiMessage};

use crate::chat::repository::ChatRepository;
use crate::chat::service::ChatService;

/// Inputs for [`prepare_messages`].
#[derive(Debug, Clone)]
pub struct PrepareContext {
    pub chat_id: String,
    pub user_id: String,
    pub trigger: ChatTrigger,
    pub message_id: Option<String>,
    pub message: Option<UiMessage>,
    /// The chat as loaded during authorization; `None` for a new chat.
    pub existing: Option<ChatWithMessages>,
}

/// Persist the incoming message and return the history to send to the model.
pub async fn prepare_messages<R: ChatRepository>(
    service: &ChatService<R>,
    ctx: PrepareContext,
) -> Result<Vec<UiMessage>, ChatError> {
    match (ctx.trigger, ctx.message_id.clone()) {
        (ChatTrigger::RegenerateAssistantMessage, Some(message_id)) => {
            regenerate(service, ctx, &message_id).await
        }
        _ => submit(service, ctx).await,
    }
}

async fn submit<R: ChatRepository>(
    service: &ChatService<R>,
    ctx: PrepareContext,
) -> Result<Vec<UiMessage>, ChatError> {
    let mut message = ctx
        .message
        .ok_or_else(|| ChatError::InvalidRequest("no message provided".to_string()))?;
    if message.id.is_empty() {
        message.id = Uuid::now_v7().to_string();
    }

    if ctx.existing.is_none() {
        service.create_chat(&ctx.chat_id, &ctx.user_id).await?;
    }
    service.upsert_message(&ctx.chat_id, &ctx.user_id, &message).await?;

    let mut history = ctx.existing.map(|c| c.messages).unwrap_or_default();
    history.retain(|m| m.id != message.id);
    history.push(message);
    Ok(history)
}

async fn regenerate<R: ChatRepository>(
    service: &ChatService<R>,
    ctx: PrepareContext,
    message_id: &str,
) -> Result<Vec<UiMessage>, ChatError> {
    let messages = match ctx.existing {
        Some(chat) => chat.messages,
        None => service.repo().load_messages(&ctx.chat_id).await?,
    };
    if messages.is_empty() {
        return Err(ChatError::MessageNotFound);
    }

    let index = match messages.iter().position(|m| m.id == message_id) {
        Some(i) => i,
        None => {
            let last_assistant = messages.iter().rposition(|m| m.role == MessageRole::Assistant);
            let last_user = messages.iter().rposition(|m| m.role == MessageRole::User);
            last_assistant.max(last_user).ok_or(ChatError::MessageNotFound)?
        }
    };
    let target = &messages[index];

    if target.role == MessageRole::Assistant {
        service
            .delete_messages_from(&ctx.chat_id, &ctx.user_id, &target.id, true)
            .await?;
        return Ok(messages[..index].to_vec());
    }

    if let Some(edited) = ctx.message.as_ref().filter(|m| m.id == message_id) {
        service.upsert_message(&ctx.chat_id, &ctx.user_id, edited).await?;
    }
    if index + 1 < messages.len() {
        service
            .delete_messages_from(&ctx.chat_id, &ctx.user_id, &target.id, false)
            .await?;
    }
    let reloaded = service.repo().load_messages(&ctx.chat_id).await?;
    if reloaded.is_empty() {
        return Ok(messages[..=index].to_vec());
    }
    Ok(reloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use morphic_types::message::MessagePart;

    use crate::cache::{CacheConfig, MemoryCache};
    use crate::testing::InMemoryChatRepository;

    fn service() -> ChatService<InMemoryChatRepository> {
        let cache = Arc::new(MemoryCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 100,
        }));
        ChatService::new(InMemoryChatRepository::new(), cache)
    }

    fn assistant(id: &str, text: &str) -> UiMessage {
        UiMessage::new(id, MessageRole::Assistant, vec![MessagePart::text(text)])
    }

    async fn seeded() -> (ChatService<InMemoryChatRepository>, ChatWithMessages) {
        let svc = service();
        svc.create_chat("c1", "u1").await.unwrap();
        for m in [
            UiMessage::user_text("m1", "Question 1"),
            assistant("m2", "Answer 1"),
            UiMessage::user_text("m3", "Question 2"),
            assistant("m4", "Answer 2"),
        ] {
            svc.upsert_message("c1", "u1", &m).await.unwrap();
        }
        let chat = svc.get_chat_with_messages("c1", "u1").await.unwrap().unwrap();
        (svc, chat)
    }

    fn ctx(trigger: ChatTrigger, message_id: Option<&str>, message: Option<UiMessage>) -> PrepareContext {
        PrepareContext {
            chat_id: "c1".into(),
            user_id: "u1".into(),
            trigger,
            message_id: message_id.map(str::to_string),
            message,
            existing: None,
        }
    }

    #[tokio::test]
    async fn submit_creates_chat_and_assigns_id() {
        let svc = service();
        let mut message = UiMessage::user_text("", "hello");
        message.id.clear();
        let history = prepare_messages(&svc, ctx(ChatTrigger::SubmitMessage, None, Some(message)))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].id.is_empty());

        let chat = svc.get_chat("c1", "u1").await.unwrap().unwrap();
        assert_eq!(chat.title, "Untitled");
        assert_eq!(svc.repo().message_ids("c1"), vec![history[0].id.clone()]);
    }

    #[tokio::test]
    async fn submit_appends_to_existing_history() {
        let (svc, chat) = seeded().await;
        let mut c = ctx(ChatTrigger::SubmitMessage, None, Some(UiMessage::user_text("m5", "Question 3")));
        c.existing = Some(chat);
        let history = prepare_messages(&svc, c).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[4].id, "m5");
    }

    #[tokio::test]
    async fn submit_without_message_fails() {
        let svc = service();
        let err = prepare_messages(&svc, ctx(ChatTrigger::SubmitMessage, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn regenerate_assistant_rewinds_to_before_it() {
        let (svc, _) = seeded().await;
        let history = prepare_messages(&svc, ctx(ChatTrigger::RegenerateAssistantMessage, Some("m4"), None))
            .await
            .unwrap();
        let ids: Vec<_> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(svc.repo().message_ids("c1"), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn regenerate_edited_user_message() {
        let (svc, _) = seeded().await;
        let edited = UiMessage::user_text("m3", "Question 2, edited");
        let history = prepare_messages(
            &svc,
            ctx(ChatTrigger::RegenerateAssistantMessage, Some("m3"), Some(edited)),
        )
        .await
        .unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].text(), "Question 2, edited");
        assert_eq!(svc.repo().message_ids("c1"), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn regenerate_unknown_id_falls_back_to_last_message() {
        let (svc, _) = seeded().await;
        let history = prepare_messages(&svc, ctx(ChatTrigger::RegenerateAssistantMessage, Some("zz"), None))
            .await
            .unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn regenerate_empty_chat_fails() {
        let svc = service();
        svc.create_chat("c1", "u1").await.unwrap();
        let err = prepare_messages(&svc, ctx(ChatTrigger::RegenerateAssistantMessage, Some("m1"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound));
    }
}
