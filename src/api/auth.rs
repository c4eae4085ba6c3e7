//! Operator authentication.
//!
//! Operator routes require `Authorization: Bearer <token>` matching the
//! configured operator token. Without a configured token every operator
//! request is rejected.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::state::AppState;
use crate::error::{Error, Result};

fn bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

fn tokens_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn require_operator(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let Some(expected) = state.config.operator_token.as_deref() else {
        warn!(uri = %req.uri(), "Operator route called but no operator token is configured");
        return Err(Error::Unauthorized);
    };

    match bearer(&req) {
        Some(token) if tokens_match(token, expected) => Ok(next.run(req).await),
        Some(_) => {
            warn!(method = %req.method(), uri = %req.uri(), "Rejected operator request: bad token");
            Err(Error::Unauthorized)
        }
        None => {
            warn!(method = %req.method(), uri = %req.uri(), "Rejected operator request: missing token");
            Err(Error::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3cres"));
        assert!(!tokens_match("s3c", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }
}
