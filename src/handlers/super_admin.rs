use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::database::models::tenant::Tenant;
use crate::error::ApiError;
use crate::handlers::auth::LoginRequest;
use crate::middleware::ApiResponse;
use crate::services::auth_service::{AuthService, Session};
use crate::services::tenant_service::TenantService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub name: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
}

/// POST /api/super-admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let session = AuthService::new(state.partitions)
        .super_admin_login(&body.email, &body.password)
        .await?;
    Ok(ApiResponse::success(session))
}

/// GET /api/super-admin/tenants — full directory, inactive rows included
pub async fn list_tenants(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Tenant>>, ApiError> {
    let tenants = TenantService::new(state.partitions).list().await?;
    Ok(ApiResponse::success(tenants))
}

/// POST /api/super-admin/tenants — provision a company: directory row,
/// isolated schema, first admin account, default config
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(body): Json<ProvisionRequest>,
) -> Result<ApiResponse<Tenant>, ApiError> {
    let tenant = TenantService::new(state.partitions)
        .provision(
            &body.name,
            &body.admin_email,
            &body.admin_password,
            &body.admin_name,
        )
        .await?;
    Ok(ApiResponse::created(tenant))
}

/// PATCH /api/super-admin/tenants/:id/activate
pub async fn activate_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
) -> Result<ApiResponse<Tenant>, ApiError> {
    let tenant = TenantService::new(state.partitions)
        .set_active(tenant_id, true)
        .await?;
    Ok(ApiResponse::success(tenant))
}

/// PATCH /api/super-admin/tenants/:id/deactivate
pub async fn deactivate_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
) -> Result<ApiResponse<Tenant>, ApiError> {
    let tenant = TenantService::new(state.partitions)
        .set_active(tenant_id, false)
        .await?;
    Ok(ApiResponse::success(tenant))
}

/// DELETE /api/super-admin/tenants/:id — drops the schema and the
/// directory row; there is no undo
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
) -> Result<ApiResponse<Tenant>, ApiError> {
    let tenant = TenantService::new(state.partitions)
        .deprovision(tenant_id)
        .await?;
    Ok(ApiResponse::success(tenant))
}
