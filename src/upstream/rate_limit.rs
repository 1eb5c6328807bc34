// =============================================================================
// Upstream weight tracker: observes Binance's used-weight header
// =============================================================================
//
// Binance allows 6000 request weight per minute on the spot REST API. The
// tracker reads `X-MBX-USED-WEIGHT-1M` after every upstream response and
// keeps an atomic copy that the health endpoint can read lock-free.
//
// It never blocks or delays a request: the gateway surfaces the provider's own
// 429 to callers instead.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Weight at which we start logging warnings.
const WEIGHT_WARN_THRESHOLD: u32 = 4800;

const USED_WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Thread-safe tracker backed by atomic counters.
#[derive(Default)]
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    requests_sent: AtomicU64,
    rejections: AtomicU64,
}

/// Serialisable snapshot for the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub requests_sent: u64,
    pub rejections: u64,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed upstream response.
    pub fn observe(&self, status: reqwest::StatusCode, headers: &reqwest::header::HeaderMap) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        if !status.is_success() {
            self.rejections.fetch_add(1, Ordering::Relaxed);
        }

        let Some(weight) = headers
            .get(USED_WEIGHT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                threshold = WEIGHT_WARN_THRESHOLD,
                "upstream weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "upstream weight updated from header");
    }

    /// Record a request that never produced a response.
    pub fn observe_transport_failure(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_1m.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("requests_sent", &self.requests_sent.load(Ordering::Relaxed))
            .field("rejections", &self.rejections.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::StatusCode;

    fn headers_with_weight(w: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(USED_WEIGHT_HEADER, HeaderValue::from_str(w).unwrap());
        h
    }

    #[test]
    fn picks_up_weight_header() {
        let t = RateLimitTracker::new();
        t.observe(StatusCode::OK, &headers_with_weight("42"));
        assert_eq!(t.snapshot().used_weight_1m, 42);
        assert_eq!(t.snapshot().requests_sent, 1);
        assert_eq!(t.snapshot().rejections, 0);
    }

    #[test]
    fn counts_rejections_and_ignores_garbage_header() {
        let t = RateLimitTracker::new();
        t.observe(StatusCode::OK, &headers_with_weight("10"));
        t.observe(StatusCode::TOO_MANY_REQUESTS, &headers_with_weight("not-a-number"));
        let snap = t.snapshot();
        assert_eq!(snap.used_weight_1m, 10);
        assert_eq!(snap.requests_sent, 2);
        assert_eq!(snap.rejections, 1);
    }

    #[test]
    fn transport_failures_count_as_sent() {
        let t = RateLimitTracker::new();
        t.observe_transport_failure();
        assert_eq!(t.snapshot().requests_sent, 1);
        assert_eq!(t.snapshot().rejections, 0);
    }
}
