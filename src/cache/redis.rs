// =============================================================================
// Redis Cache Store: networked backend (cargo feature `redis`)
// =============================================================================
//
// Each entry is a hash `{ data, absexp, sldexp }`:
//   - `absexp` absolute deadline, UNIX ms (-1 when unset)
//   - `sldexp` sliding window, ms (-1 when unset)
// The key's PEXPIRE is kept at min(sliding, time-to-absolute) and refreshed
// on every read, so Redis does the eviction for us.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::{CacheEntryOptions, CacheStore};
use crate::error::CacheError;

const NOT_SET: i64 = -1;

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid redis url '{url}'"))?;
        let conn = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        info!(url, "redis cache connected");
        Ok(Self { conn })
    }
}

/// Milliseconds the key should live from `now_ms`, or `None` when the entry
/// has no expiry at all.
fn ttl_ms(now_ms: i64, absexp: i64, sldexp: i64) -> Option<i64> {
    let to_absolute = (absexp != NOT_SET).then(|| absexp - now_ms);
    let sliding = (sldexp != NOT_SET).then_some(sldexp);
    match (to_absolute, sliding) {
        (Some(a), Some(s)) => Some(a.min(s)),
        (Some(a), None) => Some(a),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

/// What a read should do to the key's expiry.
#[derive(Debug, PartialEq, Eq)]
enum Refresh {
    /// No sliding window; leave the TTL alone.
    Keep,
    /// Re-arm PEXPIRE with this many milliseconds.
    Extend(i64),
    /// Past its absolute deadline; treat as absent.
    Expired,
}

fn refresh_on_read(now_ms: i64, absexp: i64, sldexp: i64) -> Refresh {
    if absexp != NOT_SET && absexp <= now_ms {
        return Refresh::Expired;
    }
    if sldexp == NOT_SET {
        return Refresh::Keep;
    }
    match ttl_ms(now_ms, absexp, sldexp) {
        Some(ttl) if ttl > 0 => Refresh::Extend(ttl),
        Some(_) => Refresh::Expired,
        None => Refresh::Keep,
    }
}

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();

        let (data, absexp, sldexp): (Option<String>, Option<i64>, Option<i64>) =
            redis::cmd("HMGET")
                .arg(key)
                .arg("data")
                .arg("absexp")
                .arg("sldexp")
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

        let Some(data) = data else {
            return Ok(None);
        };

        let now_ms = Utc::now().timestamp_millis();
        match refresh_on_read(now_ms, absexp.unwrap_or(NOT_SET), sldexp.unwrap_or(NOT_SET)) {
            Refresh::Expired => Ok(None),
            Refresh::Keep => Ok(Some(data)),
            Refresh::Extend(ttl) => {
                let _: () = redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(ttl)
                    .query_async(&mut conn)
                    .await
                    .map_err(unavailable)?;
                debug!(cache_key = key, ttl_ms = ttl, "redis sliding expiry refreshed");
                Ok(Some(data))
            }
        }
    }

    async fn set_string(
        &self,
        key: &str,
        value: &str,
        options: CacheEntryOptions,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let now_ms = Utc::now().timestamp_millis();

        let absexp = options
            .absolute_expiry
            .map(|d| now_ms + d.as_millis() as i64)
            .unwrap_or(NOT_SET);
        let sldexp = options
            .sliding_expiry
            .map(|d| d.as_millis() as i64)
            .unwrap_or(NOT_SET);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("DEL")
            .arg(key)
            .ignore()
            .cmd("HSET")
            .arg(key)
            .arg("data")
            .arg(value)
            .arg("absexp")
            .arg(absexp)
            .arg("sldexp")
            .arg(sldexp)
            .ignore();
        if let Some(ttl) = ttl_ms(now_ms, absexp, sldexp) {
            pipe.cmd("PEXPIRE").arg(key).arg(ttl).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
