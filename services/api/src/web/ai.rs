//! services/api/src/web/ai.rs
//!
//! The quota-gated completion endpoint and its usage companions.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_helper_core::domain::Account;
use utoipa::ToSchema;

use crate::web::error::WebError;
use crate::web::protocol::{
    hours_until_reset, UsagePayload, UsageStatsPayload, MAX_INPUT_CHARS,
};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_text: String,
}

#[derive(Serialize, ToSchema)]
pub struct CompletionResponse {
    pub success: bool,
    pub result: String,
    pub usage: UsagePayload,
}

#[derive(Serialize, ToSchema)]
pub struct UsageResponse {
    pub success: bool,
    pub usage: UsageStatsPayload,
}

#[derive(Serialize, ToSchema)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub usage: UsagePayload,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /ai/request - Proxy text to the completion model
#[utoipa::path(
    post,
    path = "/ai/request",
    request_body = CompletionRequest,
    responses(
        (status = 200, description = "Completion generated", body = CompletionResponse),
        (status = 400, description = "Missing fields or oversized input"),
        (status = 429, description = "Daily limit reached"),
        (status = 502, description = "Completion API failed; quota not consumed")
    )
)]
pub async fn completion_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<CompletionRequest>,
) -> Result<impl IntoResponse, WebError> {
    if req.system_prompt.trim().is_empty() || req.user_text.trim().is_empty() {
        return Err(WebError::Validation(
            "Missing system_prompt or user_text".to_string(),
        ));
    }
    if req.user_text.chars().count() > MAX_INPUT_CHARS {
        return Err(WebError::Validation(
            "Input text cannot exceed 5000 characters".to_string(),
        ));
    }

    let now = Utc::now();
    let mut usage = account.usage.clone();
    let admitted = usage.check_admission(now);

    // Admission may have rolled an expired window; persist that before
    // anything else so repeated denials don't re-derive stale state.
    if usage != account.usage {
        state.db.save_usage(account.id, &usage).await?;
    }

    if !admitted {
        return Err(WebError::QuotaExceeded {
            usage: UsagePayload::from_window(&usage),
            resets_in_hours: hours_until_reset(&usage, now),
        });
    }

    // Check-then-act: two concurrent requests from the same account can both
    // pass admission and push the counter past the limit. The store-side
    // atomic increment below keeps the count itself accurate; admission is
    // re-read per request.
    let result = state
        .completion
        .complete(&req.system_prompt, &req.user_text)
        .await?;

    // Only a successful completion consumes quota; the upstream error path
    // above returns without touching the counter.
    usage.record_request();
    state.db.increment_usage(account.id).await?;

    Ok(Json(CompletionResponse {
        success: true,
        result,
        usage: UsagePayload::from_window(&usage),
    }))
}

/// GET /ai/usage - Current usage statistics
#[utoipa::path(
    get,
    path = "/ai/usage",
    responses(
        (status = 200, description = "Usage statistics", body = UsageResponse),
        (status = 401, description = "Missing, invalid, or expired token")
    )
)]
pub async fn usage_stats_handler(Extension(account): Extension<Account>) -> Json<UsageResponse> {
    // Read-only: reports the stored window as-is. The lazy roll happens on
    // the next admission check, not here.
    Json(UsageResponse {
        success: true,
        usage: UsageStatsPayload::from_window(&account.usage, Utc::now()),
    })
}

/// POST /ai/reset - Force-reset the usage window
#[utoipa::path(
    post,
    path = "/ai/reset",
    responses(
        (status = 200, description = "Usage reset", body = ResetResponse),
        (status = 401, description = "Missing, invalid, or expired token")
    )
)]
pub async fn reset_usage_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, WebError> {
    let mut usage = account.usage.clone();
    usage.reset(Utc::now());
    state.db.save_usage(account.id, &usage).await?;

    Ok(Json(ResetResponse {
        success: true,
        message: "Usage reset successfully".to_string(),
        usage: UsagePayload::from_window(&usage),
    }))
}
