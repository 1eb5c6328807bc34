// =============================================================================
// Upstream Fetcher: outbound calls to the market-data provider
// =============================================================================
//
// One GET per call. No retry, no backoff, no circuit breaking: the first
// failure goes straight back to the gateway, which decides what the caller
// sees. Transport failures and non-2xx answers are distinct outcomes.
// =============================================================================

pub mod binance;
#[cfg(test)]
pub mod fake;
pub mod rate_limit;

use async_trait::async_trait;
use reqwest::StatusCode;

pub use binance::BinanceClient;
pub use rate_limit::{RateLimitSnapshot, RateLimitTracker};

/// Result of a single upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamResponse {
    /// 2xx with the raw body.
    Success { status: StatusCode, body: String },
    /// The provider answered with a non-2xx status.
    Rejected { status: StatusCode, reason: String },
    /// No usable response (DNS, connect, TLS, timeout, body read).
    Transport { message: String },
}

impl UpstreamResponse {
    /// Reason phrase for `status`, as sent back to callers on rejection.
    pub fn reason_for(status: StatusCode) -> String {
        status.canonical_reason().unwrap_or_default().to_string()
    }
}

#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Candlesticks for `symbol`/`interval`, newest `limit` rows.
    async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> UpstreamResponse;

    /// Full exchange metadata document.
    async fn fetch_exchange_info(&self) -> UpstreamResponse;

    /// Current upstream weight usage, when the implementation tracks it.
    fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        None
    }
}
