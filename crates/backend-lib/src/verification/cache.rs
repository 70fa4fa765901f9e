// ============================
// backend-lib/src/verification/cache.rs
// ============================
//! Shared expiring key-value cache holding pending verification challenges.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

/// Cache failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Expiring key-value cache
#[async_trait]
pub trait CodeCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value; evicted after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Current value, `None` when absent or evicted
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key`. Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove `key` only while it still holds `expected`. Returns whether it was removed.
    async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    evict_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.evict_at
    }
}

/// In-process implementation of [`CodeCache`]
#[derive(Debug, Clone, Default)]
pub struct MemoryCodeCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every evicted entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purge evicted entries so abandoned challenges do not pile up
    pub fn spawn_janitor(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, "purged evicted cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl CodeCache for MemoryCodeCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                evict_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        // remove_if keeps the check and the removal under one shard lock
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(key, |_, entry| entry.is_live(now) && entry.value == expected)
            .is_some())
    }
}
