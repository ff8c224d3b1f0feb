use axum::extract::{Extension, Query};
use axum::Json;
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use crate::database::models::attendance::{Attendance, AttendanceStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::attendance_service::{
    AttendanceService, AttendanceStats, ClockInResult,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockRequest {
    pub status: Option<AttendanceStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub face_verified: bool,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    31
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<i32>,
}

/// POST /api/attendance/clock-in
pub async fn clock_in(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<ClockRequest>,
) -> Result<ApiResponse<ClockInResult>, ApiError> {
    let result = AttendanceService::new(&pool)
        .clock_in(
            auth_user.user_id,
            body.status,
            body.latitude,
            body.longitude,
            body.face_verified,
            body.photo,
        )
        .await?;
    Ok(ApiResponse::created(result))
}

/// POST /api/attendance/clock-out
pub async fn clock_out(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    body: Option<Json<ClockRequest>>,
) -> Result<ApiResponse<Attendance>, ApiError> {
    let Json(body) = body.unwrap_or_default();
    let attendance = AttendanceService::new(&pool)
        .clock_out(auth_user.user_id, body.face_verified, body.photo)
        .await?;
    Ok(ApiResponse::success(attendance))
}

/// GET /api/attendance/today
pub async fn today(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<Option<Attendance>>, ApiError> {
    let attendance = AttendanceService::new(&pool).today(auth_user.user_id).await?;
    Ok(ApiResponse::success(attendance))
}

/// GET /api/attendance/history?page=&limit=
pub async fn history(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(query): Query<PageQuery>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (rows, total) = AttendanceService::new(&pool)
        .history(auth_user.user_id, query.page, query.limit)
        .await?;
    Ok(ApiResponse::success(json!({
        "records": rows,
        "total": total,
        "page": query.page.max(1),
        "limit": query.limit,
    })))
}

/// GET /api/attendance/statistics?year=&month=
pub async fn statistics(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(query): Query<MonthQuery>,
) -> Result<ApiResponse<AttendanceStats>, ApiError> {
    let today = Local::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    let stats = AttendanceService::new(&pool)
        .monthly_statistics(auth_user.user_id, year, month)
        .await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/attendance/all-today — everyone's rows for the current day
pub async fn all_today(
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<Vec<Attendance>>, ApiError> {
    let rows = AttendanceService::new(&pool).all_today().await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/attendance/report?startDate=&endDate=&userId=
pub async fn report(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(query): Query<ReportQuery>,
) -> Result<ApiResponse<Vec<Attendance>>, ApiError> {
    let rows = AttendanceService::new(&pool)
        .report(query.start_date, query.end_date, query.user_id)
        .await?;
    Ok(ApiResponse::success(rows))
}
