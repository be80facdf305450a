//! services/api/src/web/error.rs
//!
//! The request-level error type and its mapping onto HTTP responses.
//!
//! Validation and auth failures are produced directly at the boundary with a
//! client-facing message; store and upstream failures are logged server-side
//! and surfaced as a generic message, never leaking internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use study_helper_core::ports::PortError;
use tracing::error;

use crate::web::protocol::UsagePayload;

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    /// The account's daily window is exhausted. Carries the current usage
    /// numbers and a reset hint for the response body.
    #[error("Daily API limit reached. Limit resets in {resets_in_hours} hours.")]
    QuotaExceeded {
        usage: UsagePayload,
        resets_in_hours: i64,
    },

    /// Per-IP throttle tripped (not the per-account quota).
    #[error("{0}")]
    Throttled(String),

    /// The completion API call failed. Never consumes quota.
    #[error("Failed to process AI request")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<PortError> for WebError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => WebError::NotFound(msg),
            PortError::Duplicate(msg) => WebError::Duplicate(msg),
            PortError::Upstream(msg) => WebError::Upstream(msg),
            PortError::Unexpected(msg) => WebError::Internal(msg),
        }
    }
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::Validation(_) | WebError::Duplicate(_) => StatusCode::BAD_REQUEST,
            WebError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::QuotaExceeded { .. } | WebError::Throttled(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            WebError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // Diagnostics stay on the server; the client sees the Display text.
        match &self {
            WebError::Upstream(detail) => error!("Completion API call failed: {}", detail),
            WebError::Internal(detail) => error!("Internal error: {}", detail),
            _ => {}
        }

        let status = self.status();
        let body = match &self {
            WebError::QuotaExceeded {
                usage,
                resets_in_hours,
            } => json!({
                "success": false,
                "error": self.to_string(),
                "usage": {
                    "used": usage.used,
                    "limit": usage.limit,
                    "remaining": usage.remaining,
                    "resets_in_hours": resets_in_hours,
                },
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            WebError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::Duplicate("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::Upstream("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            WebError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn port_errors_map_without_leaking_detail() {
        let err: WebError = PortError::Unexpected("connection refused".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Client-facing text is generic even though the variant keeps the detail.
        assert_eq!(err.to_string(), "Internal server error");

        let err: WebError = PortError::Upstream("timeout".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Failed to process AI request");
    }
}
