use axum::extract::State;

use crate::database::models::tenant::TenantSummary;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::tenant_service::TenantService;
use crate::AppState;

/// GET /api/tenants — public listing the login screen uses to offer a
/// company picker; names and ids only
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<TenantSummary>>, ApiError> {
    let tenants = TenantService::new(state.partitions)
        .list_active_summaries()
        .await?;
    Ok(ApiResponse::success(tenants))
}
