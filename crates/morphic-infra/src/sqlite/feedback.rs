//! SQLite site-feedback repository.
//!
//! Feedback is insert-only and not user-scoped, so it is written without an
//! ownership check.

use chrono::SecondsFormat;

use morphic_core::chat::repository::FeedbackRepository;
use morphic_types::error::RepositoryError;
use morphic_types::feedback::SiteFeedback;

use super::pool::DatabasePool;

#[derive(Clone)]
pub struct SqliteFeedbackRepository {
    pool: DatabasePool,
}

impl SqliteFeedbackRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl FeedbackRepository for SqliteFeedbackRepository {
    async fn save_feedback(&self, feedback: &SiteFeedback) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO feedback (id, user_id, sentiment, message, page_url, user_agent, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&feedback.id)
        .bind(&feedback.user_id)
        .bind(feedback.sentiment.to_string())
        .bind(&feedback.message)
        .bind(&feedback.page_url)
        .bind(&feedback.user_agent)
        .bind(feedback.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.message().contains("UNIQUE")
            {
                return RepositoryError::Conflict(format!("feedback {} already exists", feedback.id));
            }
            RepositoryError::Query(e.to_string())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::test_pool;
    use chrono::Utc;
    use morphic_types::feedback::Sentiment;

    fn make_feedback(id: &str) -> SiteFeedback {
        SiteFeedback {
            id: id.to_string(),
            user_id: None,
            sentiment: Sentiment::Positive,
            message: "Great answers".to_string(),
            page_url: "https://morphic.local/search".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_feedback() {
        let pool = test_pool().await;
        let repo = SqliteFeedbackRepository::new(pool.clone());
        repo.save_feedback(&make_feedback("f1")).await.unwrap();

        let (sentiment, agent): (String, Option<String>) =
            sqlx::query_as("SELECT sentiment, user_agent FROM feedback WHERE id = 'f1'")
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        assert_eq!(sentiment, "positive");
        assert_eq!(agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let repo = SqliteFeedbackRepository::new(test_pool().await);
        repo.save_feedback(&make_feedback("f1")).await.unwrap();
        let err = repo.save_feedback(&make_feedback("f1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
