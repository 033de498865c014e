//! Slack incoming-webhook notifier for site feedback.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use morphic_core::chat::feedback::FeedbackNotifier;
use morphic_types::feedback::{Sentiment, SiteFeedback};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: SecretString,
}

impl SlackNotifier {
    pub fn new(webhook_url: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client, webhook_url }
    }
}

fn sentiment_emoji(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "😊",
        Sentiment::Neutral => "😐",
        Sentiment::Negative => "😞",
    }
}

/// Block Kit payload summarizing one feedback entry.
fn message_payload(feedback: &SiteFeedback) -> Value {
    let emoji = sentiment_emoji(feedback.sentiment);
    json!({
        "text": format!("New feedback received {emoji}"),
        "blocks": [
            {
                "type": "header",
                "text": {"type": "plain_text", "text": format!("New Feedback {emoji}")}
            },
            {
                "type": "section",
                "fields": [
                    {"type": "mrkdwn", "text": format!("*Sentiment:*\n{}", feedback.sentiment)},
                    {"type": "mrkdwn", "text": format!("*From:*\n{}", feedback.user_id.as_deref().unwrap_or("Anonymous"))}
                ]
            },
            {
                "type": "section",
                "text": {"type": "mrkdwn", "text": format!("*Message:*\n{}", feedback.message)}
            },
            {
                "type": "context",
                "elements": [{
                    "type": "mrkdwn",
                    "text": format!("Page: {} | Time: {}", feedback.page_url, feedback.created_at.to_rfc3339())
                }]
            }
        ]
    })
}

#[async_trait]
impl FeedbackNotifier for SlackNotifier {
    async fn notify(&self, feedback: &SiteFeedback) -> anyhow::Result<()> {
        self.client
            .post(self.webhook_url.expose_secret())
            .json(&message_payload(feedback))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feedback(sentiment: Sentiment) -> SiteFeedback {
        SiteFeedback {
            id: "f1".to_string(),
            user_id: None,
            sentiment,
            message: "Great answers".to_string(),
            page_url: "https://morphic.sh/".to_string(),
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = message_payload(&feedback(Sentiment::Negative));
        assert_eq!(payload["text"], "New feedback received 😞");
        assert_eq!(payload["blocks"][1]["fields"][1]["text"], "*From:*\nAnonymous");
        assert_eq!(payload["blocks"][2]["text"]["text"], "*Message:*\nGreat answers");
    }

    #[tokio::test]
    async fn test_notify_posts_and_surfaces_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ok = SlackNotifier::new(SecretString::from(format!("{}/hook", server.uri())));
        ok.notify(&feedback(Sentiment::Positive)).await.unwrap();

        let broken = SlackNotifier::new(SecretString::from(format!("{}/broken", server.uri())));
        assert!(broken.notify(&feedback(Sentiment::Neutral)).await.is_err());
    }
}
