use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{CacheEntryOptions, CacheStore};
use crate::error::CacheError;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    absolute_deadline: Option<Instant>,
    sliding: Option<Duration>,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        if let Some(deadline) = self.absolute_deadline {
            if now >= deadline {
                return true;
            }
        }
        if let Some(window) = self.sliding {
            if now >= self.last_access + window {
                return true;
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// InMemoryCache
// ---------------------------------------------------------------------------

/// Process-local cache with absolute + sliding expiry.
///
/// Expired entries are dropped lazily on read and in bulk by
/// [`InMemoryCache::purge_expired`], which the sweeper task calls
/// periodically.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.lock();
        let before = map.len();
        map.retain(|_, e| !e.is_expired(now));
        before - map.len()
    }

    /// Number of live entries (expired-but-unswept entries included).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut map = self.entries.lock();

        match map.get_mut(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => {
                entry.last_access = now;
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
        }

        map.remove(key);
        debug!(cache_key = key, "evicted expired entry on read");
        Ok(None)
    }

    async fn set_string(
        &self,
        key: &str,
        value: &str,
        options: CacheEntryOptions,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            absolute_deadline: options.absolute_expiry.map(|d| now + d),
            sliding: options.sliding_expiry,
            last_access: now,
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Spawn a background task that purges expired entries every `every`.
pub fn spawn_sweeper(cache: Arc<InMemoryCache>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let dropped = cache.purge_expired();
            if dropped > 0 {
                info!(dropped, remaining = cache.len(), "cache sweep");
            }
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
