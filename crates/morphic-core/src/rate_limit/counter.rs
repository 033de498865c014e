//! Counter store port and an in-process implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use morphic_types::error::RateLimitError;

/// Atomic increment-and-expire counters (Redis `INCR` / `EXPIRE` semantics).
///
/// Implementations: `RedisCounterStore` in morphic-infra, and
/// [`InMemoryCounterStore`] for single-process deployments and tests.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` (creating it at 0) and return the new value.
    async fn incr(&self, key: &str) -> Result<u64, RateLimitError>;

    /// Expire `key` after `seconds`.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), RateLimitError>;
}

struct Counter {
    count: u64,
    expires_at: Option<Instant>,
}

/// Counters held in a `DashMap`.
///
/// Every `incr` drops the keys whose expiry has passed, so day-scoped keys
/// from earlier days do not pile up.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<u64, RateLimitError> {
        let now = Instant::now();
        self.counters
            .retain(|_, counter| counter.expires_at.is_none_or(|at| now < at));

        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });
        counter.count += 1;
        Ok(counter.count)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), RateLimitError> {
        if let Some(mut counter) = self.counters.get_mut(key) {
            counter.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }
}
