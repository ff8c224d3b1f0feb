use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::auth_service::{AuthService, LoginOutcome, Session};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantLoginRequest {
    pub email: String,
    pub password: String,
    pub tenant_id: i32,
}

/// POST /api/auth/login
///
/// Header-free login: sweeps every active tenant for the email. One match
/// authenticates directly; several return the candidate tenants so the
/// client can retry with an explicit choice.
pub async fn auto_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<LoginOutcome>, ApiError> {
    let outcome = AuthService::new(state.partitions)
        .auto_login(&body.email, &body.password)
        .await?;
    Ok(ApiResponse::success(outcome))
}

/// POST /api/auth/login-tenant
pub async fn login_with_tenant(
    State(state): State<AppState>,
    Json(body): Json<TenantLoginRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let session = AuthService::new(state.partitions)
        .login_with_tenant(&body.email, &body.password, body.tenant_id)
        .await?;
    Ok(ApiResponse::success(session))
}
