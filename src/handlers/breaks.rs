use axum::extract::{Extension, Query};
use axum::Json;
use serde_json::json;

use crate::database::models::attendance::Break;
use crate::error::ApiError;
use crate::handlers::attendance::{ClockRequest, PageQuery};
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::attendance_service::{AttendanceService, TodayBreaks};

/// POST /api/break/start
pub async fn start(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    body: Option<Json<ClockRequest>>,
) -> Result<ApiResponse<Break>, ApiError> {
    let Json(body) = body.unwrap_or_default();
    let started = AttendanceService::new(&pool)
        .start_break(auth_user.user_id, body.face_verified, body.photo)
        .await?;
    Ok(ApiResponse::created(started))
}

/// POST /api/break/end
pub async fn end(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    body: Option<Json<ClockRequest>>,
) -> Result<ApiResponse<Break>, ApiError> {
    let Json(body) = body.unwrap_or_default();
    let ended = AttendanceService::new(&pool)
        .end_break(auth_user.user_id, body.face_verified, body.photo)
        .await?;
    Ok(ApiResponse::success(ended))
}

/// GET /api/break/today
pub async fn today(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<TodayBreaks>, ApiError> {
    let breaks = AttendanceService::new(&pool)
        .today_breaks(auth_user.user_id)
        .await?;
    Ok(ApiResponse::success(breaks))
}

/// GET /api/break/history?page=&limit=
pub async fn history(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(query): Query<PageQuery>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (rows, total) = AttendanceService::new(&pool)
        .break_history(auth_user.user_id, query.page, query.limit)
        .await?;
    Ok(ApiResponse::success(json!({
        "records": rows,
        "total": total,
        "page": query.page.max(1),
        "limit": query.limit,
    })))
}
