use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;

use crate::database::models::task::{Task, TaskStatus};
use crate::database::models::user::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser, TenantPool};
use crate::services::task_service::{NewTask, TaskFilter, TaskService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: TaskStatus,
}

/// POST /api/tasks
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Json(body): Json<NewTask>,
) -> Result<ApiResponse<Vec<Task>>, ApiError> {
    let tasks = TaskService::new(&pool)
        .create(auth_user.user_id, parse_role(&auth_user.role), body)
        .await?;
    Ok(ApiResponse::created(tasks))
}

/// GET /api/tasks?status=&assigneeId=
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Query(filter): Query<TaskFilter>,
) -> Result<ApiResponse<Vec<Task>>, ApiError> {
    let tasks = TaskService::new(&pool).list(filter).await?;
    Ok(ApiResponse::success(tasks))
}

/// GET /api/tasks/my
pub async fn my_tasks(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
) -> Result<ApiResponse<Vec<Task>>, ApiError> {
    let tasks = TaskService::new(&pool).my_tasks(auth_user.user_id).await?;
    Ok(ApiResponse::success(tasks))
}

/// PATCH /api/tasks/:id/status
pub async fn update_status(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(task_id): Path<i32>,
    Json(body): Json<StatusUpdate>,
) -> Result<ApiResponse<Task>, ApiError> {
    let task = TaskService::new(&pool)
        .update_status(task_id, auth_user.user_id, body.status)
        .await?;
    Ok(ApiResponse::success(task))
}

/// DELETE /api/tasks/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Path(task_id): Path<i32>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    TaskService::new(&pool)
        .delete(task_id, auth_user.user_id, parse_role(&auth_user.role))
        .await?;
    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}

fn parse_role(role: &str) -> Role {
    match role {
        "ADMIN" | "SUPER_ADMIN" => Role::Admin,
        "LEADER" => Role::Leader,
        _ => Role::User,
    }
}
