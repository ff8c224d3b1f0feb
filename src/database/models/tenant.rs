use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Directory row mapping a company to its isolated schema. Lives in the
/// shared `public` schema; the schema name is assigned once at provisioning
/// and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i32,
    pub name: String,
    pub schema_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Public listing view: id + display name only
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: i32,
    pub name: String,
}
