// =============================================================================
// Cache Store: narrow get/set capability shared by every gateway endpoint
// =============================================================================
//
// Values are opaque strings (serialized JSON). A missing key is the normal
// miss signal, not an error. Backends must be safe for concurrent use from
// independent request handlers; the gateway takes no locks of its own.
// =============================================================================

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

/// Expiry policy attached to a single write.
///
/// An entry is evicted at whichever deadline fires first. The sliding window
/// restarts on every successful read; the absolute deadline never moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheEntryOptions {
    pub absolute_expiry: Option<Duration>,
    pub sliding_expiry: Option<Duration>,
}

impl CacheEntryOptions {
    pub const fn new(absolute: Duration, sliding: Duration) -> Self {
        Self {
            absolute_expiry: Some(absolute),
            sliding_expiry: Some(sliding),
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up `key`, refreshing its sliding window on a hit.
    async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set_string(
        &self,
        key: &str,
        value: &str,
        options: CacheEntryOptions,
    ) -> Result<(), CacheError>;

    /// Short backend label for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}
