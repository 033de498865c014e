//! Bounded TTL + LRU cache.
//!
//! `MemoryCache` keeps at most `max_entries` values, each expiring `ttl`
//! after it was written. Reads promote entries to most-recently-used; when a
//! new key arrives at capacity the least-recently-used entry is evicted.
//! Expired entries are removed lazily on read and in bulk by `cleanup`,
//! which `spawn_sweeper` runs on an interval.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use morphic_types::config::CacheSettings;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Expiry and capacity of a [`MemoryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl From<&CacheSettings> for CacheConfig {
    /// Uses the clamped values of the settings.
    fn from(settings: &CacheSettings) -> Self {
        let effective = settings.effective();
        Self {
            ttl: Duration::from_secs(effective.ttl_secs),
            max_entries: effective.max_entries,
        }
    }
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// `hits / (hits + misses)`, or 0 before the first hit.
    pub hit_rate: f64,
}

pub struct MemoryCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + 'static> MemoryCache<V> {
    /// A zero `max_entries` is treated as 1.
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            max_entries: capacity.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Entry<V>>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Insert or replace `key`, resetting its expiry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        let key = key.into();
        if let Some((evicted, _)) = self.lock().push(key.clone(), entry) {
            if evicted != key {
                tracing::trace!(key = %evicted, "cache entry evicted");
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = match entries.peek(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            entries.pop(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Returns whether the key was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Remove every key starting with `prefix`; returns how many were removed.
    pub fn delete_pattern(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        keys.len()
    }

    /// Drop all entries. Statistics are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove expired entries; returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate,
        }
    }

    /// Run `cleanup` every `every` until `cancel` fires.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = self.cleanup();
                        let stats = self.stats();
                        tracing::debug!(
                            removed,
                            size = stats.size,
                            hit_rate = format!("{:.2}%", stats.hit_rate * 100.0),
                            "cache sweep"
                        );
                    }
                }
            }
            tracing::debug!("cache sweeper stopped");
        })
    }
}
