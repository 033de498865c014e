//! Exponential backoff retry for fallible async operations.
//!
//! The delay before retry `n` (0-based) is
//! `min(initial_delay * multiplier^n, max_delay)`. After `max_retries`
//! failed retries the last error is returned.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

// ---------------------------------------------------------------------------
// RetryOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5000),
            multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    /// Tuned for database writes: 2 retries, 200ms initial, 2s cap.
    pub fn database() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(2000),
            ..Self::default()
        }
    }

    /// Delay before the retry following failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

// ---------------------------------------------------------------------------
// Retry loops
// ---------------------------------------------------------------------------

/// Run `op` until it succeeds or `options.max_retries` retries are spent.
///
/// `on_retry` is called with the error and the 1-based retry number before
/// each wait.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut op: F,
    options: &RetryOptions,
    mut on_retry: impl FnMut(&E, u32),
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= options.max_retries => return Err(e),
            Err(e) => {
                on_retry(&e, attempt + 1);
                tokio::time::sleep(options.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// [`retry_with_backoff`] with [`RetryOptions::database`] and a warning per retry.
pub async fn retry_database_operation<T, E, F, Fut>(op: F, operation_name: &str) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff(op, &RetryOptions::database(), |e, attempt| {
        tracing::warn!(operation = operation_name, attempt, error = %e, "retrying database operation");
    })
    .await
}
