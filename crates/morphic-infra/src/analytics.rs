//! Analytics sink that records chat events as structured tracing events.
//!
//! Events go to the `morphic::analytics` target so a log pipeline can route
//! them separately from application logs.

use async_trait::async_trait;

use morphic_core::analytics::{AnalyticsSink, ChatMessageEvent, NoopAnalytics};

pub const CHAT_MESSAGE_SENT: &str = "chat_message_sent";

pub struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
    async fn track_chat_message(&self, event: ChatMessageEvent) {
        match serde_json::to_string(&event) {
            Ok(properties) => tracing::info!(
                target: "morphic::analytics",
                event = CHAT_MESSAGE_SENT,
                chat_id = %event.chat_id,
                model_id = %event.model_id,
                %properties,
                "analytics event"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to serialize analytics event"),
        }
    }
}

/// Events are only recorded for cloud deployments.
pub fn analytics_sink(cloud_deployment: bool) -> std::sync::Arc<dyn AnalyticsSink> {
    if cloud_deployment {
        std::sync::Arc::new(TracingAnalytics)
    } else {
        std::sync::Arc::new(NoopAnalytics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphic_types::model::{ModelType, SearchMode};

    #[tokio::test]
    async fn test_tracing_sink_accepts_event() {
        let sink = analytics_sink(true);
        sink.track_chat_message(ChatMessageEvent {
            search_mode: SearchMode::Quick,
            model_type: Some(ModelType::Speed),
            conversation_turn: 1,
            is_new_chat: true,
            trigger: "submit-message".to_string(),
            chat_id: "c1".to_string(),
            user_id: "u1".to_string(),
            model_id: "gpt-4o-mini".to_string(),
        })
        .await;
    }
}
