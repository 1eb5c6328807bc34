// =============================================================================
// Shared application state handed to every axum handler
// =============================================================================

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::GatewayConfig;
use crate::gateway::MarketDataGateway;
use crate::upstream::UpstreamFetcher;

pub struct AppState {
    pub config: GatewayConfig,
    pub gateway: MarketDataGateway,
    /// Instant when the service started. Used for uptime on `/api/health`.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        cache: Arc<dyn CacheStore>,
        upstream: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        Self {
            config,
            gateway: MarketDataGateway::new(cache, upstream),
            start_time: std::time::Instant::now(),
        }
    }

    /// Bearer token gateway endpoints require, if any.
    pub fn api_token(&self) -> Option<&str> {
        self.config.api_token.as_deref()
    }
}
