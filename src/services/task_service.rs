use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::database::models::task::{Task, TaskStatus};
use crate::database::models::user::Role;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assignee_ids: Vec<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i32>,
    pub creator_id: Option<i32>,
}

pub struct TaskService<'a> {
    pool: &'a PgPool,
}

impl<'a> TaskService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create one task row per assignee so each person tracks their own
    /// status, all inside one transaction.
    pub async fn create(
        &self,
        creator_id: i32,
        creator_role: Role,
        new_task: NewTask,
    ) -> Result<Vec<Task>, TaskError> {
        if !matches!(creator_role, Role::Admin | Role::Leader) {
            return Err(TaskError::Forbidden(
                "Only admins and leaders can assign tasks".to_string(),
            ));
        }
        if new_task.title.trim().is_empty() {
            return Err(TaskError::Validation("Title is required".to_string()));
        }
        if new_task.assignee_ids.is_empty() {
            return Err(TaskError::Validation(
                "At least one assignee is required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(new_task.assignee_ids.len());

        for assignee_id in &new_task.assignee_ids {
            let exists: Option<(i32,)> =
                sqlx::query_as("SELECT id FROM users WHERE id = $1 AND is_active = true")
                    .bind(assignee_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(TaskError::Validation(format!(
                    "Assignee {} does not exist or is inactive",
                    assignee_id
                )));
            }

            let task = sqlx::query_as::<_, Task>(
                "INSERT INTO tasks (title, description, assignee_id, creator_id, due_date) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING *",
            )
            .bind(&new_task.title)
            .bind(new_task.description.as_deref().unwrap_or(""))
            .bind(assignee_id)
            .bind(creator_id)
            .bind(new_task.due_date)
            .fetch_one(&mut *tx)
            .await?;

            created.push(task);
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, TaskError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks \
             WHERE ($1::task_status IS NULL OR status = $1) \
               AND ($2::integer IS NULL OR assignee_id = $2) \
               AND ($3::integer IS NULL OR creator_id = $3) \
             ORDER BY created_at DESC",
        )
        .bind(filter.status)
        .bind(filter.assignee_id)
        .bind(filter.creator_id)
        .fetch_all(self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn my_tasks(&self, user_id: i32) -> Result<Vec<Task>, TaskError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE assignee_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(tasks)
    }

    /// Assignee or creator may move the status; anyone else is rejected
    pub async fn update_status(
        &self,
        task_id: i32,
        actor_id: i32,
        status: TaskStatus,
    ) -> Result<Task, TaskError> {
        let task = self.get(task_id).await?;

        if task.assignee_id != actor_id && task.creator_id != actor_id {
            return Err(TaskError::Forbidden(
                "You can only update tasks assigned to you or created by you".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(task_id)
        .fetch_one(self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        task_id: i32,
        actor_id: i32,
        actor_role: Role,
    ) -> Result<(), TaskError> {
        let task = self.get(task_id).await?;

        if task.creator_id != actor_id && !matches!(actor_role, Role::Admin) {
            return Err(TaskError::Forbidden(
                "You can only delete tasks you created".to_string(),
            ));
        }

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, task_id: i32) -> Result<Task, TaskError> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(TaskError::NotFound)
    }
}
