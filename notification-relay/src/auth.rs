//! Bearer-token authorization gate

use crate::error::RelayError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Compare an `Authorization` header against `Bearer <secret>` in constant time
pub fn bearer_matches(header: Option<&str>, secret: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let expected = format!("Bearer {}", secret);
    header.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Middleware that rejects requests without the shared secret
pub async fn require_bearer(
    State(secret): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !bearer_matches(header, &secret) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with invalid bearer token"
        );
        return RelayError::Forbidden.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_matches() {
        assert!(bearer_matches(Some("Bearer s3cret"), "s3cret"));

        assert!(!bearer_matches(None, "s3cret"));
        assert!(!bearer_matches(Some("s3cret"), "s3cret"));
        assert!(!bearer_matches(Some("bearer s3cret"), "s3cret"));
        assert!(!bearer_matches(Some("Bearer s3cret "), "s3cret"));
        assert!(!bearer_matches(Some("Bearer wrong"), "s3cret"));
        assert!(!bearer_matches(Some(""), "s3cret"));
    }
}
