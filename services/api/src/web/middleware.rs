//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::error::WebError;
use crate::web::state::AppState;

/// Middleware that validates the bearer token and resolves it to an account.
///
/// The pipeline is: extract the `Authorization` header, verify the token
/// (expired and malformed produce distinct 401 bodies), then look the subject
/// up in the store - a deleted account holding a still-valid token is turned
/// away here. On success the resolved `Account` is inserted into request
/// extensions; that is the only way downstream handlers learn who is calling.
/// Nothing is cached across requests.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebError::Unauthenticated("Not authorized, no token".to_string()))?;

    let token = bearer_token(header)
        .ok_or_else(|| WebError::Unauthenticated("Not authorized, no token".to_string()))?;

    let account_id = state
        .tokens
        .verify(token)
        .map_err(|e| WebError::Unauthenticated(e.to_string()))?;

    let account = state
        .db
        .get_account_by_id(account_id)
        .await?
        .ok_or_else(|| WebError::Unauthenticated("Account no longer exists".to_string()))?;

    req.extensions_mut().insert(account);

    Ok(next.run(req).await)
}

/// Pulls the token out of an `Authorization` header value. The scheme prefix
/// is required and the token part must be non-empty.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_extracts_the_token_part() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_or_missing_token_part_is_rejected() {
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("ApiKey abc"), None);
        // The scheme is case-sensitive.
        assert_eq!(bearer_token("bearer abc"), None);
    }
}
