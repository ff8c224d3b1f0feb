use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-tenant settings singleton (at most one row per schema). Created
/// lazily with these defaults on first read if absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyConfig {
    pub id: i32,
    pub company_name: String,
    pub max_break_minutes_per_day: i32,
    pub late_threshold_minutes: i32,
    pub overtime_rate_multiplier: f64,
    pub work_start_time: String,
    pub work_end_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyConfig {
    pub const DEFAULT_COMPANY_NAME: &'static str = "My Company";
    pub const DEFAULT_MAX_BREAK_MINUTES: i32 = 60;
    pub const DEFAULT_LATE_THRESHOLD_MINUTES: i32 = 15;
    pub const DEFAULT_OVERTIME_RATE: f64 = 1.5;
    pub const DEFAULT_WORK_START: &'static str = "09:00";
    pub const DEFAULT_WORK_END: &'static str = "17:00";
}
