// =============================================================================
// Kline Gateway: Main Entry Point
// =============================================================================
//
// Cache-aside HTTP gateway in front of the Binance public market-data API.
// TLS is terminated by the proxy in front of this process; the listener here
// speaks plain HTTP.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod cache;
mod config;
mod error;
mod gateway;
mod transform;
mod types;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::cache::{CacheStore, InMemoryCache};
use crate::config::{CacheBackend, GatewayConfig};
use crate::upstream::BinanceClient;

const CONFIG_PATH: &str = "gateway_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Kline Gateway starting up");

    let mut config = GatewayConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        GatewayConfig::default()
    });
    config.apply_env(|key| std::env::var(key).ok())?;

    info!(config = ?config, "Effective configuration");
    if config.api_token.is_none() {
        warn!("GATEWAY_API_TOKEN is not set, gateway endpoints are unauthenticated");
    }

    // ── 2. Cache store ───────────────────────────────────────────────────
    let cache = build_cache(&config).await?;
    info!(backend = cache.backend_name(), "Cache store ready");

    // ── 3. Upstream client ───────────────────────────────────────────────
    let upstream = Arc::new(BinanceClient::new(
        config.upstream_base_url.clone(),
        config.upstream_timeout_secs.map(Duration::from_secs),
    )?);

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, cache, upstream));
    let app = api::rest::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 5. Serve until Ctrl+C ────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Kline Gateway shut down complete.");
    Ok(())
}

/// Pick the configured cache backend. The in-memory store also gets a
/// background sweeper.
async fn build_cache(config: &GatewayConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.cache_backend {
        #[cfg(feature = "redis")]
        CacheBackend::Redis => match cache::RedisCache::connect(&config.redis_url).await {
            Ok(redis) => Ok(Arc::new(redis)),
            Err(e) => {
                warn!(error = %e, "redis unavailable at startup, using memory cache");
                Ok(in_memory(config))
            }
        },
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            warn!("redis cache requested but this build lacks the `redis` feature, using memory");
            Ok(in_memory(config))
        }
        CacheBackend::Memory => Ok(in_memory(config)),
    }
}

fn in_memory(config: &GatewayConfig) -> Arc<dyn CacheStore> {
    let cache = Arc::new(InMemoryCache::new());
    cache::memory::spawn_sweeper(
        cache.clone(),
        Duration::from_secs(config.cache_sweep_interval_secs.max(1)),
    );
    cache
}
