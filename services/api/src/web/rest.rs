//! services/api/src/web/rest.rs
//!
//! Liveness endpoints and the master definition for the OpenAPI
//! specification.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{ai, auth, history, protocol};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        auth::update_password_handler,
        auth::delete_account_handler,
        ai::completion_handler,
        ai::usage_stats_handler,
        ai::reset_usage_handler,
        history::save_history_handler,
        history::list_history_handler,
        history::history_stats_handler,
        history::get_history_handler,
        history::delete_history_handler,
        history::clear_history_handler,
        history::cleanup_history_handler,
    ),
    components(schemas(
        HealthResponse,
        protocol::MessageResponse,
        protocol::UsagePayload,
        protocol::UsageStatsPayload,
        protocol::AccountPayload,
        protocol::HistoryPayload,
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::UpdatePasswordRequest,
        auth::DeleteAccountRequest,
        auth::AuthResponse,
        auth::MeResponse,
        ai::CompletionRequest,
        ai::CompletionResponse,
        ai::UsageResponse,
        ai::ResetResponse,
        history::SaveHistoryRequest,
        history::SaveHistoryResponse,
        history::HistoryItemResponse,
        history::ListHistoryResponse,
        history::StatsResponse,
        history::DeletedCountResponse,
    )),
    tags(
        (name = "AI Study Helper API", description = "Authenticated endpoints for AI-assisted studying with per-account daily quotas.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Liveness Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// GET / - Banner for the curious
pub async fn root_handler() -> &'static str {
    "AI Study Helper API is running..."
}

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}
