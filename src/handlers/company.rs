use axum::extract::Extension;
use axum::Json;

use crate::database::models::company_config::CompanyConfig;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::config_service::{self, ConfigUpdate};

/// GET /api/config
pub async fn get(
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<CompanyConfig>, ApiError> {
    let config = config_service::get_or_create(&pool).await?;
    Ok(ApiResponse::success(config))
}

/// PUT /api/config
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<ConfigUpdate>,
) -> Result<ApiResponse<CompanyConfig>, ApiError> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    let config = config_service::update(&pool, body).await?;
    Ok(ApiResponse::success(config))
}
