use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Leader,
    User,
}

/// Billing basis for base pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "salary_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalaryType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

/// Employee account, unique per tenant schema. Email uniqueness holds only
/// within a tenant; the same address may exist under several companies.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub role: Role,
    pub photo: Option<String>,
    #[serde(skip_serializing)]
    pub face_descriptor: Option<String>,
    pub face_registered: bool,
    pub is_active: bool,
    pub salary_type: SalaryType,
    pub salary: f64,
    pub start_work_time: String,
    pub late_penalty: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
