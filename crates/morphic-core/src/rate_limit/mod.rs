//! Daily usage limits backed by an atomic counter store.

pub mod counter;
pub mod limiter;

pub use counter::{CounterStore, InMemoryCounterStore};
pub use limiter::DailyRateLimiter;
