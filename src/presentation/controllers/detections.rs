//! Detection controller for run and read endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::{DetectionService, errors::ApplicationError};
use crate::domain::Category;
use crate::infrastructure::cache::PersistentCache;
use crate::infrastructure::tenant::TenantDataService;
use crate::presentation::models::{
    CategorySummaryDto, DetectionListResponse, DetectionRecordDto, DetectionRunResponse,
    ErrorResponse, SummaryResponse,
};

/// Application state containing services
#[derive(Clone)]
pub struct AppState {
    pub detection_service: Arc<dyn DetectionService>,
    pub tenant_data: Arc<TenantDataService>,
    pub cache: Arc<PersistentCache>,
}

/// Query parameters for record listings
#[derive(Deserialize)]
pub struct DetectionListQuery {
    pub category: Option<String>,
    pub force_refresh: Option<bool>,
}

/// Run every registered detector and return the aggregated records
#[utoipa::path(
    post,
    path = "/api/v1/detections/run",
    tag = "detections",
    responses(
        (status = 200, description = "Detection run completed", body = DetectionRunResponse),
        (status = 502, description = "Directory API unavailable", body = ErrorResponse)
    )
)]
pub async fn run_detections(
    State(state): State<AppState>,
) -> Result<Json<DetectionRunResponse>, ApplicationError> {
    let report = state.detection_service.run_all().await?;

    Ok(Json(DetectionRunResponse {
        run_id: report.run_id,
        started_at: report.started_at,
        duration_ms: report.duration.as_millis() as u64,
        total: report.records.len(),
        failed_categories: report
            .failed_categories
            .into_iter()
            .map(|category| category.to_string())
            .collect(),
        records: report.records.into_iter().map(Into::into).collect(),
    }))
}

/// List aggregated detection records, optionally filtered by category
#[utoipa::path(
    get,
    path = "/api/v1/detections",
    tag = "detections",
    params(
        ("category" = Option<String>, Query, description = "Filter to a single detector category"),
        ("force_refresh" = Option<bool>, Query, description = "Bypass the in-memory snapshot")
    ),
    responses(
        (status = 200, description = "Aggregated detection records", body = DetectionListResponse),
        (status = 400, description = "Invalid category", body = ErrorResponse)
    )
)]
pub async fn list_detections(
    State(state): State<AppState>,
    Query(query): Query<DetectionListQuery>,
) -> Result<Json<DetectionListResponse>, ApplicationError> {
    let records = match query.category.as_deref() {
        Some(raw) => {
            let category: Category = raw.parse()?;
            state.detection_service.get_by_category(&category).await?
        }
        None => {
            state
                .detection_service
                .get_all(query.force_refresh.unwrap_or(false))
                .await?
        }
    };

    let records: Vec<DetectionRecordDto> = records.into_iter().map(Into::into).collect();
    Ok(Json(DetectionListResponse {
        total: records.len(),
        records,
    }))
}

/// Per-category summary of aggregated records
#[utoipa::path(
    get,
    path = "/api/v1/detections/summary",
    tag = "detections",
    responses(
        (status = 200, description = "Per-category summary", body = SummaryResponse)
    )
)]
pub async fn get_detection_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, ApplicationError> {
    let summary = state.detection_service.get_summary().await?;

    let mut categories: Vec<CategorySummaryDto> = summary
        .iter()
        .map(|(category, summary)| CategorySummaryDto::new(category.to_string(), summary))
        .collect();
    categories.sort_by(|a, b| a.category.cmp(&b.category));

    Ok(Json(SummaryResponse { categories }))
}
