use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform operator account. Stored in the shared `public` schema, never
/// tenant-scoped, and checked before any tenant lookup during login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SuperAdmin {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
