use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::user_service::{FaceStatus, FaceVerification, UserService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorRequest {
    pub descriptor: Vec<f64>,
}

/// POST /api/face/register
pub async fn register(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<DescriptorRequest>,
) -> Result<ApiResponse<FaceStatus>, ApiError> {
    let status = UserService::new(&pool)
        .register_face(auth_user.user_id, &body.descriptor)
        .await?;
    Ok(ApiResponse::success(status))
}

/// POST /api/face/verify
pub async fn verify(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<DescriptorRequest>,
) -> Result<ApiResponse<FaceVerification>, ApiError> {
    let verification = UserService::new(&pool)
        .verify_face(auth_user.user_id, &body.descriptor)
        .await?;
    Ok(ApiResponse::success(verification))
}

/// GET /api/face/status
pub async fn status(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<FaceStatus>, ApiError> {
    let status = UserService::new(&pool).face_status(auth_user.user_id).await?;
    Ok(ApiResponse::success(status))
}
