//! Scripted in-process upstream for gateway and router tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use super::{UpstreamFetcher, UpstreamResponse};

pub const KLINES_3_ROWS: &str = r#"[
  [1700000000000,"36500.10","36550.00","36480.00","36520.55","12.345",1700000059999,"450800.12",321,"6.1","222900.05","0"],
  [1700000060000,"36520.55","36600.00","36510.00","36590.00","8.001",1700000119999,"292700.00",210,"4.0","146300.00","0"],
  [1700000120000,"36590.00","36595.00","36400.00","0.00012345",  "20.5",1700000179999,"747000.00",512,"10.2","371700.00","0"]
]"#;

pub const EXCHANGE_INFO: &str = r#"{
  "timezone": "UTC",
  "serverTime": 1700000000000,
  "symbols": [
    {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC"},
    {"symbol": "ETHUSDT", "status": "TRADING", "baseAsset": "ETH"}
  ]
}"#;

/// Returns the same scripted outcome on every call and counts calls.
pub struct ScriptedUpstream {
    klines: Mutex<UpstreamResponse>,
    exchange_info: Mutex<UpstreamResponse>,
    kline_calls: AtomicUsize,
    exchange_info_calls: AtomicUsize,
    last_kline_query: Mutex<Option<(String, String, u32)>>,
}

pub fn ok(body: &str) -> UpstreamResponse {
    UpstreamResponse::Success {
        status: StatusCode::OK,
        body: body.to_string(),
    }
}

pub fn rejected(status: StatusCode) -> UpstreamResponse {
    UpstreamResponse::Rejected {
        status,
        reason: UpstreamResponse::reason_for(status),
    }
}

pub fn transport(message: &str) -> UpstreamResponse {
    UpstreamResponse::Transport {
        message: message.to_string(),
    }
}

impl ScriptedUpstream {
    pub fn new(klines: UpstreamResponse, exchange_info: UpstreamResponse) -> Self {
        Self {
            klines: Mutex::new(klines),
            exchange_info: Mutex::new(exchange_info),
            kline_calls: AtomicUsize::new(0),
            exchange_info_calls: AtomicUsize::new(0),
            last_kline_query: Mutex::new(None),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ok(KLINES_3_ROWS), ok(EXCHANGE_INFO))
    }

    pub fn set_klines(&self, response: UpstreamResponse) {
        *self.klines.lock() = response;
    }

    pub fn set_exchange_info(&self, response: UpstreamResponse) {
        *self.exchange_info.lock() = response;
    }

    pub fn kline_calls(&self) -> usize {
        self.kline_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_info_calls(&self) -> usize {
        self.exchange_info_calls.load(Ordering::SeqCst)
    }

    pub fn last_kline_query(&self) -> Option<(String, String, u32)> {
        self.last_kline_query.lock().clone()
    }
}

#[async_trait]
impl UpstreamFetcher for ScriptedUpstream {
    async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> UpstreamResponse {
        self.kline_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_kline_query.lock() = Some((symbol.to_string(), interval.to_string(), limit));
        self.klines.lock().clone()
    }

    async fn fetch_exchange_info(&self) -> UpstreamResponse {
        self.exchange_info_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_info.lock().clone()
    }
}
