//! Site feedback and per-message rating types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maps to `CHECK (sentiment IN ('positive', 'neutral', 'negative'))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(format!("invalid sentiment: '{other}'")),
        }
    }
}

/// Free-form feedback about the site, optionally tied to a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFeedback {
    pub id: String,
    pub user_id: Option<String>,
    pub sentiment: Sentiment,
    pub message: String,
    pub page_url: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Thumbs up / thumbs down on an assistant answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum FeedbackScore {
    Good,
    Bad,
}

impl TryFrom<i64> for FeedbackScore {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FeedbackScore::Good),
            -1 => Ok(FeedbackScore::Bad),
            _ => Err("score must be 1 (good) or -1 (bad)".to_string()),
        }
    }
}

impl From<FeedbackScore> for i64 {
    fn from(score: FeedbackScore) -> Self {
        match score {
            FeedbackScore::Good => 1,
            FeedbackScore::Bad => -1,
        }
    }
}

impl FeedbackScore {
    pub fn as_i8(self) -> i8 {
        match self {
            FeedbackScore::Good => 1,
            FeedbackScore::Bad => -1,
        }
    }
}
