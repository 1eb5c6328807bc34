// =============================================================================
// Shared types used across the kline gateway
// =============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntryOptions;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/marketData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataRequest {
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(alias = "Interval")]
    pub interval: String,
}

impl MarketDataRequest {
    /// Cache key for this series. Symbol and interval are interpolated
    /// verbatim, so `BTCUSDT` and `btcusdt` are distinct slots.
    pub fn cache_key(&self) -> String {
        format!("marketData_{}_{}", self.symbol, self.interval)
    }
}

// =============================================================================
// Klines
// =============================================================================

/// Wire form of a kline: an 11-element JSON array.
type KlineTuple = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
);

/// A single OHLCV candle as returned to callers.
///
/// Decimal quantities stay as the provider's strings so no precision is ever
/// lost to `f64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "KlineTuple", from = "KlineTuple")]
pub struct Kline {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: String,
    pub taker_buy_quote_asset_volume: String,
}

impl From<Kline> for KlineTuple {
    fn from(k: Kline) -> Self {
        (
            k.open_time,
            k.open,
            k.high,
            k.low,
            k.close,
            k.volume,
            k.close_time,
            k.quote_asset_volume,
            k.number_of_trades,
            k.taker_buy_base_asset_volume,
            k.taker_buy_quote_asset_volume,
        )
    }
}

impl From<KlineTuple> for Kline {
    fn from(t: KlineTuple) -> Self {
        Self {
            open_time: t.0,
            open: t.1,
            high: t.2,
            low: t.3,
            close: t.4,
            volume: t.5,
            close_time: t.6,
            quote_asset_volume: t.7,
            number_of_trades: t.8,
            taker_buy_base_asset_volume: t.9,
            taker_buy_quote_asset_volume: t.10,
        }
    }
}

// =============================================================================
// Exchange metadata
// =============================================================================

/// The only part of a provider symbol entry we keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    #[serde(alias = "Symbol")]
    pub symbol: String,
}

/// Projection of the provider's exchange-info document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    #[serde(alias = "Symbols")]
    pub symbols: Vec<SymbolInfo>,
}

// =============================================================================
// Intervals
// =============================================================================

/// Every interval token the gateway advertises, in display order.
pub const INTERVALS: [&str; 16] = [
    "1s", "1m", "3m", "5m", "15m", "30m", "1H", "2H", "4H", "6H", "8H", "12H", "1D", "3D", "1W",
    "1M",
];

// =============================================================================
// Cache keys & TTL policies
// =============================================================================

pub const EXCHANGE_INFO_CACHE_KEY: &str = "exchangeInfo";
pub const INTERVALS_CACHE_KEY: &str = "intervals";

/// Number of klines requested from the provider per series.
pub const KLINE_LIMIT: u32 = 500;

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

pub const KLINE_TTL: CacheEntryOptions = CacheEntryOptions::new(minutes(5), minutes(2));
pub const EXCHANGE_INFO_TTL: CacheEntryOptions = CacheEntryOptions::new(minutes(30), minutes(10));
pub const INTERVALS_TTL: CacheEntryOptions = CacheEntryOptions::new(minutes(60), minutes(30));

// =============================================================================
// Tests
// =============================================================================
