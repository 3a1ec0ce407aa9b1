//! Tenant overview controller

use axum::{extract::State, response::Json};

use crate::application::errors::ApplicationError;
use crate::presentation::controllers::detections::AppState;
use crate::presentation::models::{ErrorResponse, TenantOverviewResponse};

/// Snapshot of what the tenant looks like right now. Served from the cache;
/// only true misses hit the directory API.
#[utoipa::path(
    get,
    path = "/api/v1/tenant",
    tag = "tenant",
    responses(
        (status = 200, description = "Tenant overview", body = TenantOverviewResponse),
        (status = 502, description = "Directory API unavailable", body = ErrorResponse)
    )
)]
pub async fn get_tenant_overview(
    State(state): State<AppState>,
) -> Result<Json<TenantOverviewResponse>, ApplicationError> {
    let organization = state.tenant_data.organization().await?;
    let users = state.tenant_data.users().await?;
    let licenses = state.tenant_data.licenses().await?;

    let enabled_users = users.iter().filter(|user| user.account_enabled).count();

    Ok(Json(TenantOverviewResponse {
        organization: organization.into(),
        total_users: users.len(),
        enabled_users,
        licenses: licenses.into_iter().map(Into::into).collect(),
    }))
}
