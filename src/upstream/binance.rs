// =============================================================================
// Binance REST client: public market-data endpoints only
// =============================================================================
//
// Query parameters are form-encoded but otherwise passed through untouched;
// the provider validates symbol and interval, not us. Request timeouts are reqwest's defaults unless the
// operator configures one.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, error, info, instrument};

use super::{RateLimitSnapshot, RateLimitTracker, UpstreamFetcher, UpstreamResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance spot REST client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (no trailing slash needed).
    ///
    /// `timeout` of `None` keeps reqwest's default behaviour.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("invalid upstream base url '{base_url}'"))?;

        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("failed to build reqwest client")?;

        debug!(base_url = %base_url, ?timeout, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    // -------------------------------------------------------------------------
    // URL helpers
    // -------------------------------------------------------------------------

    /// `GET /api/v3/klines` URL for the given series. Each value lands in
    /// exactly one query parameter, whatever characters it contains.
    pub fn klines_url(&self, symbol: &str, interval: &str, limit: u32) -> Result<Url> {
        let limit = limit.to_string();
        Url::parse_with_params(
            &format!("{}/api/v3/klines", self.base_url),
            &[("symbol", symbol), ("interval", interval), ("limit", limit.as_str())],
        )
        .context("failed to build klines url")
    }

    pub fn exchange_info_url(&self) -> Result<Url> {
        Url::parse(&format!("{}/api/v3/exchangeInfo", self.base_url))
            .context("failed to build exchangeInfo url")
    }

    // -------------------------------------------------------------------------
    // Request execution
    // -------------------------------------------------------------------------

    /// Issue one GET and classify the outcome.
    async fn get(&self, url: Result<Url>) -> UpstreamResponse {
        let url = match url {
            Ok(u) => u,
            Err(e) => {
                error!(error = %e, "could not build upstream url");
                return UpstreamResponse::Transport {
                    message: e.to_string(),
                };
            }
        };
        let started = Instant::now();

        let resp = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                self.rate_limit.observe_transport_failure();
                error!(url = %url, error = %e, "upstream request error");
                return UpstreamResponse::Transport {
                    message: e.to_string(),
                };
            }
        };

        let status = resp.status();
        self.rate_limit.observe(status, resp.headers());

        if !status.is_success() {
            info!(
                url = %url,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "upstream rejected request"
            );
            return UpstreamResponse::Rejected {
                status,
                reason: UpstreamResponse::reason_for(status),
            };
        }

        match resp.text().await {
            Ok(body) => {
                info!(
                    url = %url,
                    bytes = body.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "time taken to fetch data from upstream"
                );
                UpstreamResponse::Success { status, body }
            }
            Err(e) => {
                error!(url = %url, error = %e, "failed reading upstream body");
                UpstreamResponse::Transport {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl UpstreamFetcher for BinanceClient {
    #[instrument(skip(self), name = "binance::fetch_klines")]
    async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> UpstreamResponse {
        self.get(self.klines_url(symbol, interval, limit)).await
    }

    #[instrument(skip(self), name = "binance::fetch_exchange_info")]
    async fn fetch_exchange_info(&self) -> UpstreamResponse {
        self.get(self.exchange_info_url()).await
    }

    fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        Some(self.rate_limit.snapshot())
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}
