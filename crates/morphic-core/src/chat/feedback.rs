//! Site feedback intake.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use morphic_types::error::RepositoryError;
use morphic_types::feedback::{Sentiment, SiteFeedback};

use crate::chat::repository::FeedbackRepository;

/// Out-of-band notification of new feedback (e.g. a chat webhook).
#[async_trait]
pub trait FeedbackNotifier: Send + Sync {
    async fn notify(&self, feedback: &SiteFeedback) -> anyhow::Result<()>;
}

/// Fields supplied by the client.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub sentiment: Sentiment,
    pub message: String,
    pub page_url: String,
    pub user_agent: Option<String>,
}

pub struct FeedbackService<F: FeedbackRepository> {
    repo: F,
    notifier: Option<Arc<dyn FeedbackNotifier>>,
}

impl<F: FeedbackRepository> FeedbackService<F> {
    pub fn new(repo: F) -> Self {
        Self { repo, notifier: None }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn FeedbackNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Store feedback, attributing it to `user_id` when signed in.
    ///
    /// Notification failures are logged and ignored.
    pub async fn save_site_feedback(
        &self,
        user_id: Option<&str>,
        input: NewFeedback,
    ) -> Result<SiteFeedback, RepositoryError> {
        let feedback = SiteFeedback {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.map(str::to_string),
            sentiment: input.sentiment,
            message: input.message,
            page_url: input.page_url,
            user_agent: input.user_agent,
            created_at: Utc::now(),
        };
        self.repo.save_feedback(&feedback).await?;
        info!(feedback_id = %feedback.id, sentiment = %feedback.sentiment, "site feedback saved");

        if let Some(notifier) = &self.notifier
            && let Err(e) = notifier.notify(&feedback).await
        {
            warn!(error = %e, "feedback notification failed");
        }
        Ok(feedback)
    }
}
