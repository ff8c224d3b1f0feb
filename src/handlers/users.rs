use axum::extract::{Extension, Path, State};
use axum::Json;

use crate::database::models::user::User;
use crate::error::ApiError;
use crate::handlers::auth::LoginRequest;
use crate::middleware::{ApiResponse, AuthUser, TenantContext, TenantPool};
use crate::services::auth_service::{AuthService, Session};
use crate::services::tenant_service::TenantService;
use crate::services::user_service::{NewUser, UserService, UserUpdate};
use crate::AppState;

/// POST /api/users/login — direct login when the client already knows its
/// tenant and sends the X-Tenant-ID header
pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let tenant = TenantService::new(state.partitions.clone())
        .resolve(ctx.tenant_id)
        .await?;
    let session = AuthService::new(state.partitions)
        .login_bound(&pool, &tenant, &body.email, &body.password)
        .await?;
    Ok(ApiResponse::success(session))
}

/// GET /api/users
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<Vec<User>>, ApiError> {
    let users = UserService::new(&pool).list().await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/users
pub async fn create(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewUser>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = UserService::new(&pool).create(body).await?;
    Ok(ApiResponse::created(user))
}

/// GET /api/users/profile
pub async fn profile(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = UserService::new(&pool).get(auth_user.user_id).await?;
    Ok(ApiResponse::success(user))
}

/// GET /api/users/:id
pub async fn get(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(user_id): Path<i32>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = UserService::new(&pool).get(user_id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:id
pub async fn update(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(user_id): Path<i32>,
    Json(body): Json<UserUpdate>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = UserService::new(&pool).update(user_id, body).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
pub async fn delete(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(user_id): Path<i32>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    UserService::new(&pool).delete(user_id).await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}
