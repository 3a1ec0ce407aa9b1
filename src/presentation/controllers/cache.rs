//! Cache management controller for admin endpoints

use axum::{extract::State, response::Json};
use tracing::info;

use crate::application::errors::ApplicationError;
use crate::presentation::controllers::detections::AppState;
use crate::presentation::models::{
    CacheInvalidationRequest, CacheInvalidationResponse, CacheStatsResponse, ErrorResponse,
};

/// Get cache statistics
#[utoipa::path(
    get,
    path = "/api/v1/cache/stats",
    tag = "cache",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStatsResponse)
    )
)]
pub async fn get_cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.cache.stats().await.into())
}

/// Invalidate cache entries
#[utoipa::path(
    post,
    path = "/api/v1/cache/invalidate",
    tag = "cache",
    request_body = CacheInvalidationRequest,
    responses(
        (status = 200, description = "Entries invalidated", body = CacheInvalidationResponse),
        (status = 400, description = "Key given without an entry type", body = ErrorResponse)
    )
)]
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(request): Json<CacheInvalidationRequest>,
) -> Result<Json<CacheInvalidationResponse>, ApplicationError> {
    let entries_invalidated = state
        .cache
        .invalidate(request.entry_type.as_deref(), request.key.as_deref())
        .await?;

    info!(
        entry_type = request.entry_type.as_deref().unwrap_or("*"),
        key = request.key.as_deref().unwrap_or("*"),
        entries_invalidated,
        "Cache invalidated"
    );

    Ok(Json(CacheInvalidationResponse {
        message: format!("Invalidated {} cache entries", entries_invalidated),
        entries_invalidated,
    }))
}
