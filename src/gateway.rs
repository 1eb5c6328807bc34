// =============================================================================
// Market Data Gateway: cache-aside orchestration per endpoint
// =============================================================================
//
// key → cache read → hit: validate & return
//                  → miss: upstream → transform → cache write → return
//
// The cache is best-effort: read failures count as misses, write failures are
// logged and the fresh data is still returned. Concurrent misses on the same
// key each go upstream; the last write wins.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntryOptions, CacheStore};
use crate::error::GatewayError;
use crate::transform;
use crate::types::{
    Kline, MarketDataRequest, SymbolInfo, EXCHANGE_INFO_CACHE_KEY, EXCHANGE_INFO_TTL, INTERVALS,
    INTERVALS_CACHE_KEY, INTERVALS_TTL, KLINE_LIMIT, KLINE_TTL,
};
use crate::upstream::{UpstreamFetcher, UpstreamResponse};

#[derive(Clone)]
pub struct MarketDataGateway {
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamFetcher>,
}

impl MarketDataGateway {
    pub fn new(cache: Arc<dyn CacheStore>, upstream: Arc<dyn UpstreamFetcher>) -> Self {
        Self { cache, upstream }
    }

    pub fn upstream(&self) -> &dyn UpstreamFetcher {
        self.upstream.as_ref()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend_name()
    }

    // -------------------------------------------------------------------------
    // Klines
    // -------------------------------------------------------------------------

    /// Serialized kline series for `req`. A cache hit is returned verbatim.
    pub async fn klines(&self, req: &MarketDataRequest) -> Result<String, GatewayError> {
        if req.symbol.is_empty() || req.interval.is_empty() {
            return Err(GatewayError::BadRequest(
                "symbol and interval are required".into(),
            ));
        }

        let key = req.cache_key();
        if let Some(cached) = self.read(&key).await {
            match serde_json::from_str::<Vec<Kline>>(&cached) {
                Ok(_) => return Ok(cached),
                Err(e) => warn!(cache_key = %key, error = %e, "discarding unreadable cache entry"),
            }
        }

        let body = match self
            .upstream
            .fetch_klines(&req.symbol, &req.interval, KLINE_LIMIT)
            .await
        {
            UpstreamResponse::Success { status, body } => {
                debug!(status = status.as_u16(), bytes = body.len(), "klines received");
                body
            }
            UpstreamResponse::Rejected { status, reason } => {
                return Err(GatewayError::Rejected { status, reason })
            }
            UpstreamResponse::Transport { message } => {
                return Err(GatewayError::Transport(message))
            }
        };

        let klines = transform::project_klines(&body)?;
        let rendered = transform::render_klines(&klines)?;
        self.write(&key, &rendered, KLINE_TTL).await;
        Ok(rendered)
    }

    // -------------------------------------------------------------------------
    // Exchange info
    // -------------------------------------------------------------------------

    /// Every tradable symbol. The raw upstream document is what gets cached.
    pub async fn symbols(&self) -> Result<Vec<SymbolInfo>, GatewayError> {
        if let Some(cached) = self.read(EXCHANGE_INFO_CACHE_KEY).await {
            match transform::parse_exchange_info(&cached) {
                Ok(info) => return Ok(info.symbols),
                Err(e) => warn!(
                    cache_key = EXCHANGE_INFO_CACHE_KEY,
                    error = %e,
                    "discarding unreadable cache entry"
                ),
            }
        }

        let body = match self.upstream.fetch_exchange_info().await {
            UpstreamResponse::Success { status, body } => {
                debug!(status = status.as_u16(), bytes = body.len(), "exchange info received");
                body
            }
            UpstreamResponse::Rejected { status, reason } => {
                return Err(GatewayError::Rejected { status, reason })
            }
            UpstreamResponse::Transport { message } => {
                return Err(GatewayError::Transport(message))
            }
        };

        let info = transform::parse_exchange_info(&body)?;
        self.write(EXCHANGE_INFO_CACHE_KEY, &body, EXCHANGE_INFO_TTL)
            .await;
        Ok(info.symbols)
    }

    // -------------------------------------------------------------------------
    // Intervals
    // -------------------------------------------------------------------------

    /// The static interval table, routed through the cache like the others.
    pub async fn intervals(&self) -> Result<Vec<String>, GatewayError> {
        if let Some(cached) = self.read(INTERVALS_CACHE_KEY).await {
            match serde_json::from_str::<Vec<String>>(&cached) {
                Ok(intervals) => return Ok(intervals),
                Err(e) => warn!(
                    cache_key = INTERVALS_CACHE_KEY,
                    error = %e,
                    "discarding unreadable cache entry"
                ),
            }
        }

        let intervals: Vec<String> = INTERVALS.iter().map(|s| s.to_string()).collect();
        let json = serde_json::to_string(&intervals)?;
        self.write(INTERVALS_CACHE_KEY, &json, INTERVALS_TTL).await;
        Ok(intervals)
    }

    // -------------------------------------------------------------------------
    // Cache helpers
    // -------------------------------------------------------------------------

    async fn read(&self, key: &str) -> Option<String> {
        let started = Instant::now();
        let result = self.cache.get_string(key).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Some(value)) if !value.is_empty() => {
                info!(cache_key = key, elapsed_ms, "cache hit");
                Some(value)
            }
            Ok(_) => {
                info!(cache_key = key, elapsed_ms, "cache miss");
                None
            }
            Err(e) => {
                warn!(cache_key = key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str, options: CacheEntryOptions) {
        let started = Instant::now();
        match self.cache.set_string(key, value, options).await {
            Ok(()) => info!(
                cache_key = key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cache write"
            ),
            Err(e) => warn!(cache_key = key, error = %e, "cache write failed"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
