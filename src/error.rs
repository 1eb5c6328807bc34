// =============================================================================
// Error types for the cache, transformer and gateway seams
// =============================================================================

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the cache backend. The gateway treats it as a miss on
/// read and logs it on write.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// An upstream payload that does not have the shape we project from.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("kline payload is not an array")]
    NotAnArray,
    #[error("kline row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Everything a gateway endpoint can fail with.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// DNS, connect, TLS or timeout failure talking to the provider.
    #[error("Request error: {0}")]
    Transport(String),
    /// The provider answered with a non-2xx status.
    #[error("upstream rejected request with {status}: {reason}")]
    Rejected { status: StatusCode, reason: String },
    /// The provider answered 2xx but the body could not be projected.
    #[error("malformed upstream payload: {0}")]
    MalformedUpstream(#[from] TransformError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    BadRequest(String),
}
