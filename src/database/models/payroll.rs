use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Write-once payroll artifact. Every intermediate figure is retained for
/// audit and display; rows are never mutated after creation, only deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: i32,
    pub user_id: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub base_salary: f64,
    pub working_days: i32,
    pub working_hours: f64,
    pub overtime_hours: f64,
    pub late_deductions: f64,
    // Reserved: break penalties are not charged in this design
    pub break_deductions: f64,
    pub overtime_bonus: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub created_at: DateTime<Utc>,
}
