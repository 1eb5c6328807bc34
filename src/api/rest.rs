// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// Gateway endpoints live under `/api/` and sit behind the optional bearer
// gate. `/api/health` is always public.
//
// CORS is configured permissively; browsers call this service directly.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::api::auth::AuthGate;
use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::types::MarketDataRequest;
use crate::upstream::RateLimitSnapshot;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/health", get(health))
        // ── Gateway ─────────────────────────────────────────────────
        .route("/api/marketData", post(market_data))
        .route("/api/symbols", get(symbols))
        .route("/api/intervals", get(intervals))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Rejected { status, reason } => (status, reason).into_response(),
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            other => {
                error!(error = %other, "gateway request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response()
            }
        }
    }
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
    cache_backend: &'static str,
    upstream_weight: Option<RateLimitSnapshot>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache_backend: state.gateway.cache_backend(),
        upstream_weight: state.gateway.upstream().rate_limit(),
    })
}

// =============================================================================
// Gateway endpoints
// =============================================================================

async fn market_data(
    _auth: AuthGate,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MarketDataRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    // A missing field is the same failure as an empty one: 400, not 422.
    let Json(req) = payload.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    let body = state.gateway.klines(&req).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn symbols(
    _auth: AuthGate,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.gateway.symbols().await?))
}

async fn intervals(
    _auth: AuthGate,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.gateway.intervals().await?))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use reqwest::StatusCode as UpstreamStatus;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::GatewayConfig;
    use crate::gateway::tests::CountingCache;
    use crate::upstream::fake::{self, ScriptedUpstream};

    fn app_with(
        token: Option<&str>,
    ) -> (Router, Arc<CountingCache>, Arc<ScriptedUpstream>) {
        let cache = Arc::new(CountingCache::default());
        let upstream = Arc::new(ScriptedUpstream::healthy());
        let config = GatewayConfig {
            api_token: token.map(str::to_string),
            ..GatewayConfig::default()
        };
        let state = Arc::new(AppState::new(config, cache.clone(), upstream.clone()));
        (router(state), cache, upstream)
    }

    fn market_data_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/marketData")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn market_data_returns_kline_tuples() {
        let (app, _cache, _upstream) = app_with(None);

        let response = app
            .oneshot(market_data_request(r#"{"symbol":"BTCUSDT","interval":"1m"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_array().unwrap().len(), 11);
        assert_eq!(rows[0][0], serde_json::json!(1_700_000_000_000i64));
        assert_eq!(rows[0][1], serde_json::json!("36500.10"));
    }

    #[tokio::test]
    async fn second_market_data_call_is_served_from_cache() {
        let (app, cache, upstream) = app_with(None);
        let body = r#"{"symbol":"BTCUSDT","interval":"1m"}"#;

        let first = app.clone().oneshot(market_data_request(body)).await.unwrap();
        let first = body_string(first).await;
        let second = app.oneshot(market_data_request(body)).await.unwrap();
        let second = body_string(second).await;

        assert_eq!(first, second);
        assert_eq!(upstream.kline_calls(), 1);
        assert_eq!(cache.writes(), 1);
    }

    #[tokio::test]
    async fn upstream_429_is_propagated_with_reason() {
        let (app, cache, upstream) = app_with(None);
        upstream.set_klines(fake::rejected(UpstreamStatus::TOO_MANY_REQUESTS));

        let response = app
            .oneshot(market_data_request(r#"{"symbol":"BTCUSDT","interval":"1m"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_string(response).await, "Too Many Requests");
        assert_eq!(cache.writes(), 0);
    }

    #[tokio::test]
    async fn transport_failure_is_500_with_message() {
        let (app, _cache, upstream) = app_with(None);
        upstream.set_klines(fake::transport("error sending request"));

        let response = app
            .oneshot(market_data_request(r#"{"symbol":"BTCUSDT","interval":"1m"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            "Request error: error sending request"
        );
    }

    #[tokio::test]
    async fn empty_symbol_is_bad_request() {
        let (app, _cache, upstream) = app_with(None);
        let response = app
            .oneshot(market_data_request(r#"{"symbol":"","interval":"1m"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.kline_calls(), 0);
    }

    #[tokio::test]
    async fn missing_or_malformed_body_is_bad_request() {
        let (app, _cache, upstream) = app_with(None);

        let response = app
            .clone()
            .oneshot(market_data_request(r#"{"symbol":"BTCUSDT"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("interval"));

        let response = app.oneshot(market_data_request("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.kline_calls(), 0);
    }

    #[tokio::test]
    async fn symbols_returns_symbol_objects() {
        let (app, _cache, _upstream) = app_with(None);
        let response = app
            .oneshot(Request::builder().uri("/api/symbols").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "symbol": "BTCUSDT" }, { "symbol": "ETHUSDT" }])
        );
    }

    #[tokio::test]
    async fn intervals_lists_sixteen_tokens() {
        let (app, _cache, _upstream) = app_with(None);
        let response = app
            .oneshot(Request::builder().uri("/api/intervals").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Vec<String> = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json.len(), 16);
        assert_eq!(json[6], "1H");
    }

    #[tokio::test]
    async fn configured_token_gates_gateway_endpoints() {
        let (app, _cache, upstream) = app_with(Some("s3cret"));

        let response = app
            .clone()
            .oneshot(market_data_request(r#"{"symbol":"BTCUSDT","interval":"1m"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(upstream.kline_calls(), 0);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/intervals")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Health stays public.
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_cache_backend() {
        let (app, _cache, _upstream) = app_with(None);
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache_backend"], "counting");
        assert!(json["upstream_weight"].is_null());
    }
}
