use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::database::models::payroll::Payroll;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::payroll_service::PayrollService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub user_id: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// POST /api/payroll/generate
pub async fn generate(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<GenerateRequest>,
) -> Result<ApiResponse<Payroll>, ApiError> {
    let payroll = PayrollService::new(&pool)
        .generate(body.user_id, body.period_start, body.period_end)
        .await?;
    Ok(ApiResponse::created(payroll))
}

/// GET /api/payroll?periodStart=&periodEnd=
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(query): Query<PeriodQuery>,
) -> Result<ApiResponse<Vec<Payroll>>, ApiError> {
    let rows = PayrollService::new(&pool)
        .list(query.period_start, query.period_end)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/payroll/my
pub async fn my_payrolls(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<Vec<Payroll>>, ApiError> {
    let rows = PayrollService::new(&pool).for_user(auth_user.user_id).await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/payroll/:id — admins see all, employees only their own
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Payroll>, ApiError> {
    let payroll = PayrollService::new(&pool).get(id).await?;
    if payroll.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ApiError::forbidden("You can only view your own payrolls"));
    }
    Ok(ApiResponse::success(payroll))
}

/// DELETE /api/payroll/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    PayrollService::new(&pool).delete(id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}
