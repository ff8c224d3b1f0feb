use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Sick,
    Leave,
    Alpha,
}

/// One attendance record per user per calendar day, enforced by a
/// UNIQUE(user_id, date) constraint. Created on clock-in; clock-out and
/// break-minute accumulation are the only mutations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: i32,
    pub user_id: i32,
    pub date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub clock_in_photo: Option<String>,
    pub clock_out_photo: Option<String>,
    pub status: AttendanceStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_break_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A break taken inside a clocked-in day. `end_time` and `duration` are set
/// exactly once when the break closes; a row with a null `end_time` is the
/// user's single active break.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Break {
    pub id: i32,
    pub user_id: i32,
    // Nullable: severed if the attendance row is ever removed
    pub attendance_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub start_photo: Option<String>,
    pub end_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}
