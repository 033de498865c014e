//! Redis-backed counter store for the daily rate limiter.

use async_trait::async_trait;
use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use secrecy::{ExposeSecret, SecretString};

use morphic_core::rate_limit::CounterStore;
use morphic_types::error::RateLimitError;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Counters in Redis via a shared, auto-reconnecting `ConnectionManager`.
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to `url`, applying optional credentials.
    #[tracing::instrument(level = "debug", skip(password))]
    pub async fn connect(
        url: &str,
        username: Option<&str>,
        password: Option<&SecretString>,
    ) -> Result<Self, RateLimitError> {
        let mut info = ::redis::IntoConnectionInfo::into_connection_info(url).map_err(backend)?;
        if let Some(username) = username {
            info.redis.username = Some(username.to_string());
        }
        if let Some(password) = password {
            info.redis.password = Some(password.expose_secret().to_string());
        }

        let client = ::redis::Client::open(info).map_err(backend)?;
        let manager = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self { manager })
    }
}

fn backend(e: ::redis::RedisError) -> RateLimitError {
    RateLimitError::Backend(e.to_string())
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<u64, RateLimitError> {
        let mut conn = self.manager.clone();
        conn.incr(key, 1u64).await.map_err(backend)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), RateLimitError> {
        let mut conn = self.manager.clone();
        let _: bool = conn.expire(key, seconds as i64).await.map_err(backend)?;
        Ok(())
    }
}
