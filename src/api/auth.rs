// =============================================================================
// Bearer Token Gate: optional authentication in front of the gateway
// =============================================================================
//
// When `api_token` is configured, every gateway endpoint requires
// `Authorization: Bearer <token>`; anything else is answered with 401 before
// the handler body runs. With no token configured the gate is open.
//
// Usage as an Axum extractor:
//
//   async fn handler(_auth: AuthGate, State(state): State<Arc<AppState>>) { ... }
// =============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices in constant time. A length mismatch returns early;
/// the expected token length is not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Validate an `Authorization` header value against `expected`.
fn check_header(header: Option<&str>, expected: &str) -> Result<(), &'static str> {
    let token = match header {
        Some(value) if value.starts_with("Bearer ") => &value[7..],
        _ => return Err("Missing or invalid authorization token"),
    };
    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err("Invalid authorization token");
    }
    Ok(())
}

// =============================================================================
// Extractor
// =============================================================================

/// Passes when auth is disabled or the bearer token matches.
pub struct AuthGate;

/// Rejection returned when authentication fails.
pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthGate {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_token() else {
            return Ok(AuthGate);
        };

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        check_header(header, expected).map_err(|message| {
            warn!(path = %parts.uri.path(), reason = message, "unauthenticated request rejected");
            AuthRejection { message }
        })?;

        Ok(AuthGate)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_only_equal_bytes() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
    }

    #[test]
    fn missing_header_is_reported_as_missing() {
        assert_eq!(
            check_header(None, "s3cret"),
            Err("Missing or invalid authorization token")
        );
    }

    #[test]
    fn token_differing_only_in_length_is_rejected() {
        assert_eq!(
            check_header(Some("Bearer s3cret2"), "s3cret"),
            Err("Invalid authorization token")
        );
        assert_eq!(
            check_header(Some("Bearer s3cre"), "s3cret"),
            Err("Invalid authorization token")
        );
        assert!(check_header(Some("Bearer "), "s3cret").is_err());
    }

    #[test]
    fn scheme_is_case_sensitive() {
        assert!(check_header(Some("bearer s3cret"), "s3cret").is_err());
    }

    #[test]
    fn header_must_be_bearer() {
        assert!(check_header(None, "tok").is_err());
        assert!(check_header(Some("Basic dG9r"), "tok").is_err());
        assert!(check_header(Some("Bearer nope"), "tok").is_err());
        assert!(check_header(Some("Bearer tok"), "tok").is_ok());
    }
}
