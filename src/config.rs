// =============================================================================
// Gateway Configuration: JSON file + environment overrides
// =============================================================================
//
// Every field carries a serde default, so a missing or partial
// `gateway_config.json` still yields a runnable configuration. Environment
// variables (including those from `.env`) take precedence over the file.
//
// TTL policies and the interval table are compile-time constants in
// `types.rs`, not configuration.
// =============================================================================

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::upstream::binance::DEFAULT_BASE_URL;

// =============================================================================
// Default-value helpers
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:7125".to_string()
}

fn default_upstream_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cache_sweep_interval_secs() -> u64 {
    60
}

// =============================================================================
// CacheBackend
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => anyhow::bail!("unknown cache backend '{other}' (use 'memory' or 'redis')"),
        }
    }
}

// =============================================================================
// GatewayConfig
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listener address, `host:port`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Provider base URL, e.g. `https://api.binance.com`.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Whole-request timeout for upstream calls. Unset keeps the HTTP
    /// client's default.
    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    /// When set, gateway endpoints require `Authorization: Bearer <token>`.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub cache_backend: CacheBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// How often the in-memory cache drops expired entries.
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            upstream_base_url: default_upstream_base_url(),
            upstream_timeout_secs: None,
            api_token: None,
            cache_backend: CacheBackend::Memory,
            redis_url: default_redis_url(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind_addr", &self.bind_addr)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("cache_backend", &self.cache_backend)
            .field("redis_url", &self.redis_url)
            .field("cache_sweep_interval_secs", &self.cache_sweep_interval_secs)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Returns an error when the file is missing or invalid so the caller can
    /// fall back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read gateway config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse gateway config from {}", path.display()))?;

        info!(
            path = %path.display(),
            upstream = %config.upstream_base_url,
            cache_backend = %config.cache_backend,
            "gateway config loaded"
        );

        Ok(config)
    }

    /// Apply `GATEWAY_*` overrides using `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GATEWAY_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("GATEWAY_UPSTREAM_URL") {
            self.upstream_base_url = v;
        }
        if let Some(v) = lookup("GATEWAY_UPSTREAM_TIMEOUT_SECS") {
            let secs = v
                .parse()
                .with_context(|| format!("GATEWAY_UPSTREAM_TIMEOUT_SECS is not a number: '{v}'"))?;
            self.upstream_timeout_secs = Some(secs);
        }
        if let Some(v) = lookup("GATEWAY_API_TOKEN") {
            self.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("GATEWAY_CACHE_BACKEND") {
            self.cache_backend = v.parse()?;
        }
        if let Some(v) = lookup("GATEWAY_REDIS_URL") {
            self.redis_url = v;
        }
        Ok(())
    }
}
