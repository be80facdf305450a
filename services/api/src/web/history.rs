//! services/api/src/web/history.rs
//!
//! CRUD over saved AI interactions. Every operation is scoped to the
//! authenticated account; an id belonging to someone else behaves exactly
//! like an id that does not exist.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_helper_core::domain::{Account, HistoryKind};
use study_helper_core::ports::HistoryFilter;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::error::WebError;
use crate::web::protocol::{HistoryPayload, MessageResponse, MAX_INPUT_CHARS};
use crate::web::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 100;
const DEFAULT_CLEANUP_DAYS: i64 = 90;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SaveHistoryRequest {
    pub kind: String,
    pub input_text: String,
    pub result: String,
    #[serde(default)]
    pub source_url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub kind: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct SaveHistoryResponse {
    pub success: bool,
    pub message: String,
    pub history: HistoryPayload,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryItemResponse {
    pub success: bool,
    pub history: HistoryPayload,
}

#[derive(Serialize, ToSchema)]
pub struct Pagination {
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ListHistoryResponse {
    pub success: bool,
    pub count: usize,
    pub history: Vec<HistoryPayload>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct RecentActivity {
    pub last_7_days: u64,
}

#[derive(Serialize, ToSchema)]
pub struct StatsPayload {
    pub total: u64,
    pub explain: u64,
    pub summarize: u64,
    pub flashcards: u64,
    pub recent_activity: RecentActivity,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsPayload,
}

#[derive(Serialize, ToSchema)]
pub struct DeletedCountResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
}

/// Turns the raw query string into an owner-scoped filter. An unrecognized
/// kind filter is ignored rather than rejected; only saving is strict.
fn build_filter(query: HistoryQuery) -> HistoryFilter {
    HistoryFilter {
        kind: query.kind.as_deref().and_then(|k| k.parse().ok()),
        search: query.search.filter(|s| !s.is_empty()),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
        offset: query.offset.unwrap_or(0).max(0),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /history - Save a study result
#[utoipa::path(
    post,
    path = "/history",
    request_body = SaveHistoryRequest,
    responses(
        (status = 201, description = "History saved", body = SaveHistoryResponse),
        (status = 400, description = "Missing fields, bad kind, or oversized input")
    )
)]
pub async fn save_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<SaveHistoryRequest>,
) -> Result<impl IntoResponse, WebError> {
    if req.kind.is_empty() || req.input_text.is_empty() || req.result.is_empty() {
        return Err(WebError::Validation(
            "Missing required fields: kind, input_text, result".to_string(),
        ));
    }

    let kind = req
        .kind
        .parse::<HistoryKind>()
        .map_err(|e| WebError::Validation(e.to_string()))?;

    if req.input_text.chars().count() > MAX_INPUT_CHARS {
        return Err(WebError::Validation(
            "Input text cannot exceed 5000 characters".to_string(),
        ));
    }

    let entry = state
        .db
        .create_history(
            account.id,
            kind,
            &req.input_text,
            &req.result,
            req.source_url.trim(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveHistoryResponse {
            success: true,
            message: "History saved successfully".to_string(),
            history: HistoryPayload::from_entry(&entry),
        }),
    ))
}

/// GET /history - List saved results, newest first
#[utoipa::path(
    get,
    path = "/history",
    params(
        ("kind" = Option<String>, Query, description = "Filter by kind"),
        ("search" = Option<String>, Query, description = "Substring match over input and result"),
        ("limit" = Option<i64>, Query, description = "Page size, default 100"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "A page of history entries", body = ListHistoryResponse)
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, WebError> {
    let filter = build_filter(query);
    let page = state.db.list_history(account.id, &filter).await?;

    let history: Vec<HistoryPayload> = page.entries.iter().map(HistoryPayload::from_entry).collect();

    Ok(Json(ListHistoryResponse {
        success: true,
        count: history.len(),
        pagination: Pagination {
            total: page.total,
            limit: filter.limit,
            offset: filter.offset,
            has_more: page.total > (filter.offset + filter.limit).max(0) as u64,
        },
        history,
    }))
}

/// GET /history/stats - Per-kind counts and recent activity
#[utoipa::path(
    get,
    path = "/history/stats",
    responses(
        (status = 200, description = "History statistics", body = StatsResponse)
    )
)]
pub async fn history_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, WebError> {
    let stats = state.db.history_stats(account.id, Utc::now()).await?;

    Ok(Json(StatsResponse {
        success: true,
        stats: StatsPayload {
            total: stats.total,
            explain: stats.explain,
            summarize: stats.summarize,
            flashcards: stats.flashcards,
            recent_activity: RecentActivity {
                last_7_days: stats.last_7_days,
            },
        },
    }))
}

/// GET /history/{id} - A single owned entry
#[utoipa::path(
    get,
    path = "/history/{id}",
    params(("id" = Uuid, Path, description = "History entry id")),
    responses(
        (status = 200, description = "The entry", body = HistoryItemResponse),
        (status = 404, description = "No such entry for this account")
    )
)]
pub async fn get_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, WebError> {
    let entry = state
        .db
        .get_history_by_id(account.id, id)
        .await?
        .ok_or_else(|| WebError::NotFound("History item not found".to_string()))?;

    Ok(Json(HistoryItemResponse {
        success: true,
        history: HistoryPayload::from_entry(&entry),
    }))
}

/// DELETE /history/{id} - Delete a single owned entry
#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(("id" = Uuid, Path, description = "History entry id")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageResponse),
        (status = 404, description = "No such entry for this account")
    )
)]
pub async fn delete_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, WebError> {
    let deleted = state.db.delete_history(account.id, id).await?;
    if !deleted {
        return Err(WebError::NotFound("History item not found".to_string()));
    }

    Ok(Json(MessageResponse::new("History item deleted successfully")))
}

/// DELETE /history/clear - Delete everything this account saved
#[utoipa::path(
    delete,
    path = "/history/clear",
    responses(
        (status = 200, description = "All entries deleted", body = DeletedCountResponse)
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, WebError> {
    let deleted_count = state.db.clear_history(account.id).await?;

    Ok(Json(DeletedCountResponse {
        success: true,
        message: format!("All history cleared. {} items deleted.", deleted_count),
        deleted_count,
    }))
}

/// DELETE /history/cleanup - Delete owned entries older than N days
#[utoipa::path(
    delete,
    path = "/history/cleanup",
    params(("days" = Option<i64>, Query, description = "Age cutoff in days, default 90")),
    responses(
        (status = 200, description = "Old entries deleted", body = DeletedCountResponse),
        (status = 400, description = "Non-positive day count")
    )
)]
pub async fn cleanup_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, WebError> {
    let days = query.days.unwrap_or(DEFAULT_CLEANUP_DAYS);
    if days <= 0 {
        return Err(WebError::Validation(
            "days must be a positive number".to_string(),
        ));
    }

    let cutoff = Utc::now() - Duration::days(days);
    let deleted_count = state
        .db
        .delete_history_older_than(account.id, cutoff)
        .await?;

    Ok(Json(DeletedCountResponse {
        success: true,
        message: format!("Deleted history older than {} days", days),
        deleted_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_are_sane() {
        let filter = build_filter(HistoryQuery {
            kind: None,
            search: None,
            limit: None,
            offset: None,
        });

        assert_eq!(filter.kind, None);
        assert_eq!(filter.search, None);
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn unknown_kind_filter_is_ignored() {
        let filter = build_filter(HistoryQuery {
            kind: Some("translate".to_string()),
            search: None,
            limit: None,
            offset: None,
        });
        assert_eq!(filter.kind, None);

        let filter = build_filter(HistoryQuery {
            kind: Some("flashcards".to_string()),
            search: None,
            limit: None,
            offset: None,
        });
        assert_eq!(filter.kind, Some(HistoryKind::Flashcards));
    }

    #[test]
    fn nonsense_paging_is_clamped() {
        let filter = build_filter(HistoryQuery {
            kind: None,
            search: Some(String::new()),
            limit: Some(-5),
            offset: Some(-10),
        });

        assert_eq!(filter.limit, 1);
        assert_eq!(filter.offset, 0);
        // An empty search string means no search at all.
        assert_eq!(filter.search, None);
    }
}
