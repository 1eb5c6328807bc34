// =============================================================================
// Response Transformer: provider JSON → canonical gateway shapes
// =============================================================================
//
// Binance kline rows are positional arrays:
//   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
//   [6] closeTime, [7] quoteAssetVolume, [8] numberOfTrades,
//   [9] takerBuyBaseVolume, [10] takerBuyQuoteVolume, [11] ignore
// Only [0..=10] are kept. Decimal columns are copied as strings, never parsed.
// =============================================================================

use serde_json::Value;

use crate::error::TransformError;
use crate::types::{ExchangeInfo, Kline};

const KLINE_FIELDS: usize = 11;

/// Project an upstream klines payload into [`Kline`] records, preserving the
/// provider's row order.
pub fn project_klines(body: &str) -> Result<Vec<Kline>, TransformError> {
    let root: Value = serde_json::from_str(body)?;
    let rows = root.as_array().ok_or(TransformError::NotAnArray)?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| project_row(i, row))
        .collect()
}

fn project_row(row: usize, value: &Value) -> Result<Kline, TransformError> {
    let malformed = |reason: String| TransformError::MalformedRow { row, reason };

    let arr = value
        .as_array()
        .ok_or_else(|| malformed("row is not an array".into()))?;
    if arr.len() < KLINE_FIELDS {
        return Err(malformed(format!(
            "expected at least {KLINE_FIELDS} fields, got {}",
            arr.len()
        )));
    }

    let int = |idx: usize| {
        arr[idx]
            .as_i64()
            .ok_or_else(|| malformed(format!("field {idx} is not an integer")))
    };
    let text = |idx: usize| {
        arr[idx]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| malformed(format!("field {idx} is not a string")))
    };

    Ok(Kline {
        open_time: int(0)?,
        open: text(1)?,
        high: text(2)?,
        low: text(3)?,
        close: text(4)?,
        volume: text(5)?,
        close_time: int(6)?,
        quote_asset_volume: text(7)?,
        number_of_trades: arr[8]
            .as_u64()
            .ok_or_else(|| malformed("field 8 is not a non-negative integer".into()))?,
        taker_buy_base_asset_volume: text(9)?,
        taker_buy_quote_asset_volume: text(10)?,
    })
}

/// Indented JSON rendering of a kline series, as cached and served.
pub fn render_klines(klines: &[Kline]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(klines)
}

/// Decode an exchange-info document (upstream body or cached copy).
pub fn parse_exchange_info(body: &str) -> Result<ExchangeInfo, TransformError> {
    Ok(serde_json::from_str(body)?)
}

// =============================================================================
// Tests
// =============================================================================
