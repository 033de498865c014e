//! Daily rate-limit types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which daily budget a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// Every chat request by a signed-in user.
    Chat,
    /// Chat requests that selected the quality model type.
    QualityChat,
    /// Chat requests by guests, keyed by client IP.
    GuestChat,
}

impl LimitKind {
    /// Counter key prefix; the subject and UTC date are appended.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            LimitKind::Chat => "rl:chat",
            LimitKind::QualityChat => "rl:quality:chat",
            LimitKind::GuestChat => "rl:guest:chat",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Chat => write!(f, "chat"),
            LimitKind::QualityChat => write!(f, "quality_chat"),
            LimitKind::GuestChat => write!(f, "guest_chat"),
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// `None` when the limiter is inactive and the budget is unlimited.
    pub remaining: Option<u64>,
    /// Epoch milliseconds of the next reset (UTC midnight), 0 when inactive.
    pub reset_at: i64,
    pub limit: u64,
}

impl RateLimitDecision {
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: None,
            reset_at: 0,
            limit: 0,
        }
    }
}
