//! Health check controller

use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::json;

use crate::application::DetectionService;
use crate::presentation::controllers::detections::AppState;
use crate::presentation::models::HealthResponse;

/// Basic health check endpoint for liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: None,
    })
}

/// Detailed health check with cache statistics and run state
#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses(
        (status = 200, description = "Detailed health information", body = HealthResponse)
    )
)]
pub async fn detailed_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let run_phase = state.detection_service.run_phase().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: Some(json!({
            "run_phase": run_phase.to_string(),
            "cache": {
                "hits": cache_stats.hits,
                "misses": cache_stats.misses,
                "background_refreshes": cache_stats.background_refreshes,
                "refresh_failures": cache_stats.refresh_failures,
            },
            "build_info": {
                "version": env!("CARGO_PKG_VERSION"),
                "build_date": option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown")
            }
        })),
    })
}
