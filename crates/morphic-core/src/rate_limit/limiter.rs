//! Fail-open daily rate limiter.
//!
//! Each check increments `{prefix}:{subject}:{YYYY-MM-DD}` (UTC). The first
//! increment of the day sets the key to expire at the next UTC midnight.
//! Backend errors and slow backends never block a request: the check is
//! bounded by a timeout and any failure allows the request.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};

use morphic_types::config::{DEFAULT_GUEST_DAILY_LIMIT, RateLimitSettings};
use morphic_types::error::RateLimitError;
use morphic_types::rate_limit::{LimitKind, RateLimitDecision};

use super::counter::CounterStore;

const BACKEND_TIMEOUT: Duration = Duration::from_secs(3);

pub struct DailyRateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    limits: RateLimitSettings,
    timeout: Duration,
}

impl DailyRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, limits: RateLimitSettings) -> Self {
        Self {
            store: Some(store),
            limits,
            timeout: BACKEND_TIMEOUT,
        }
    }

    /// A limiter that allows everything (local deployments, no Redis).
    pub fn disabled(limits: RateLimitSettings) -> Self {
        Self {
            store: None,
            limits,
            timeout: BACKEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_active(&self) -> bool {
        self.store.is_some()
    }

    pub fn limit_for(&self, kind: LimitKind) -> u64 {
        match kind {
            LimitKind::Chat => self.limits.chat_daily_limit,
            LimitKind::QualityChat => self.limits.quality_daily_limit,
            LimitKind::GuestChat if self.limits.guest_daily_limit == 0 => DEFAULT_GUEST_DAILY_LIMIT,
            LimitKind::GuestChat => self.limits.guest_daily_limit,
        }
    }

    /// Count one request by `subject` against `kind`'s daily budget.
    pub async fn check(&self, kind: LimitKind, subject: &str) -> RateLimitDecision {
        self.check_at(kind, subject, Utc::now()).await
    }

    async fn check_at(&self, kind: LimitKind, subject: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let Some(store) = &self.store else {
            return RateLimitDecision::unlimited();
        };

        let limit = self.limit_for(kind);
        let key = daily_key(kind, subject, now);

        let count = match self.count(store.as_ref(), &key, now).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "rate limit check failed, allowing request");
                return RateLimitDecision::unlimited();
            }
        };

        let decision = RateLimitDecision {
            allowed: count <= limit,
            remaining: Some(limit.saturating_sub(count)),
            reset_at: next_utc_midnight(now).timestamp_millis(),
            limit,
        };
        tracing::debug!(kind = %kind, count, limit, allowed = decision.allowed, "rate limit checked");
        decision
    }

    async fn count(&self, store: &dyn CounterStore, key: &str, now: DateTime<Utc>) -> Result<u64, RateLimitError> {
        let count = tokio::time::timeout(self.timeout, store.incr(key))
            .await
            .map_err(|_| RateLimitError::Timeout)??;

        if count == 1 {
            store.expire(key, seconds_until_midnight(now)).await?;
        }
        Ok(count)
    }
}

/// `{prefix}:{subject}:{YYYY-MM-DD}` for the UTC day of `now`.
pub fn daily_key(kind: LimitKind, subject: &str, now: DateTime<Utc>) -> String {
    format!("{}:{}:{}", kind.key_prefix(), subject, now.format("%Y-%m-%d"))
}

pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(now.date_naive());
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

fn seconds_until_midnight(now: DateTime<Utc>) -> u64 {
    (next_utc_midnight(now) - now).num_seconds().max(1) as u64
}
