use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::database::models::attendance::{Attendance, AttendanceStatus, Break};
use crate::database::models::company_config::CompanyConfig;
use crate::database::models::user::User;
use crate::services::config_service;

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("User not found")]
    UserNotFound,

    #[error("Face verification required for {0}")]
    FaceVerificationRequired(&'static str),

    #[error("Attendance already recorded for today")]
    AlreadyClockedIn,

    #[error("No active check-in found")]
    NoActiveSession,

    #[error("An active break must end before clocking out")]
    ActiveBreakMustEndFirst,

    #[error("Must clock in before starting a break")]
    MustClockInFirst,

    #[error("A break is already active")]
    BreakAlreadyActive,

    #[error("Daily break limit of {0} minutes reached")]
    BreakLimitReached(i32),

    #[error("No active break found")]
    NoActiveBreak,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInResult {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub is_late: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayBreaks {
    pub breaks: Vec<Break>,
    pub total_minutes: i32,
    pub active_break: Option<Break>,
}

/// Per-status counts over a month, plus break minutes summed across the set
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_days: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub sick: usize,
    pub leave: usize,
    pub alpha: usize,
    pub total_break_minutes: i64,
}

/// Determine the clock-in status. A caller-forced non-PRESENT status (SICK,
/// LEAVE, ...) is kept as-is; otherwise the deadline is today's wall-clock
/// work start plus the late threshold, and strictly-later arrival is LATE.
/// Arriving exactly on the deadline is PRESENT.
pub fn resolve_clock_in_status(
    requested: Option<AttendanceStatus>,
    now: NaiveDateTime,
    work_start: &str,
    late_threshold_minutes: i64,
) -> AttendanceStatus {
    let status = requested.unwrap_or(AttendanceStatus::Present);
    if status != AttendanceStatus::Present {
        return status;
    }

    let (hour, minute) = parse_work_start(work_start);
    let start = NaiveTime::from_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).expect("valid fallback time"));
    let deadline = now.date().and_time(start) + Duration::minutes(late_threshold_minutes);

    if now > deadline {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// Parse an "HH:MM" wall-clock string, falling back to 09:00 on malformed
/// input (the config stores these as free-form strings).
fn parse_work_start(value: &str) -> (u32, u32) {
    let mut parts = value.splitn(2, ':');
    let hour = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let minute = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    match (hour, minute) {
        (Some(h), Some(m)) if h < 24 && m < 60 => (h, m),
        _ => (9, 0),
    }
}

/// Break length in whole minutes, rounded to nearest (millisecond-exact)
pub fn break_duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    ((end - start).num_milliseconds() as f64 / 60_000.0).round() as i32
}

/// Fold attendance rows into monthly statistics, bucketing all six statuses
pub fn summarize(rows: &[Attendance]) -> AttendanceStats {
    let mut stats = AttendanceStats {
        total_days: rows.len(),
        ..Default::default()
    };
    for row in rows {
        match row.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Late => stats.late += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Sick => stats.sick += 1,
            AttendanceStatus::Leave => stats.leave += 1,
            AttendanceStatus::Alpha => stats.alpha += 1,
        }
        stats.total_break_minutes += row.total_break_minutes as i64;
    }
    stats
}

/// Attendance state engine. Per (user, day):
/// NO_RECORD -> CLOCKED_IN -> CLOCKED_OUT (terminal), with ON_BREAK nested
/// inside CLOCKED_IN. All operations run against an already-bound tenant
/// pool, so queries cannot cross partitions.
pub struct AttendanceService<'a> {
    pool: &'a PgPool,
}

impl<'a> AttendanceService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn clock_in(
        &self,
        user_id: i32,
        requested_status: Option<AttendanceStatus>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        face_verified: bool,
        photo: Option<String>,
    ) -> Result<ClockInResult, AttendanceError> {
        let user = self.require_user(user_id).await?;
        require_face(&user, face_verified, "clock in")?;

        let today = Local::now().date_naive();
        let existing = self.find_by_date(user_id, today).await?;
        if existing.is_some() {
            return Err(AttendanceError::AlreadyClockedIn);
        }

        let config = config_service::get_or_create(self.pool).await?;
        let work_start = pick_work_start(&config, &user);
        let late_threshold = config.late_threshold_minutes as i64;

        let now = Utc::now();
        let status = resolve_clock_in_status(
            requested_status,
            Local::now().naive_local(),
            &work_start,
            late_threshold,
        );

        let attendance = sqlx::query_as::<_, Attendance>(
            "INSERT INTO attendance \
             (user_id, date, clock_in, clock_in_photo, status, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(today)
        .bind(now)
        .bind(&photo)
        .bind(status)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_to_already_clocked_in)?;

        let is_late = attendance.status == AttendanceStatus::Late;
        Ok(ClockInResult { attendance, is_late })
    }

    pub async fn clock_out(
        &self,
        user_id: i32,
        face_verified: bool,
        photo: Option<String>,
    ) -> Result<Attendance, AttendanceError> {
        let user = self.require_user(user_id).await?;
        require_face(&user, face_verified, "clock out")?;

        let attendance = self
            .find_open_session(user_id)
            .await?
            .ok_or(AttendanceError::NoActiveSession)?;

        let active_break = self.find_active_break(user_id).await?;
        if active_break.is_some() {
            return Err(AttendanceError::ActiveBreakMustEndFirst);
        }

        let updated = sqlx::query_as::<_, Attendance>(
            "UPDATE attendance \
             SET clock_out = $1, clock_out_photo = $2, updated_at = now() \
             WHERE id = $3 \
             RETURNING *",
        )
        .bind(Utc::now())
        .bind(&photo)
        .bind(attendance.id)
        .fetch_one(self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn start_break(
        &self,
        user_id: i32,
        face_verified: bool,
        photo: Option<String>,
    ) -> Result<Break, AttendanceError> {
        let user = self.require_user(user_id).await?;
        require_face(&user, face_verified, "starting break")?;

        let attendance = self
            .find_open_session(user_id)
            .await?
            .ok_or(AttendanceError::MustClockInFirst)?;

        if self.find_active_break(user_id).await?.is_some() {
            return Err(AttendanceError::BreakAlreadyActive);
        }

        let config = config_service::get_or_create(self.pool).await?;
        if attendance.total_break_minutes >= config.max_break_minutes_per_day {
            return Err(AttendanceError::BreakLimitReached(
                config.max_break_minutes_per_day,
            ));
        }

        let break_row = sqlx::query_as::<_, Break>(
            "INSERT INTO breaks (user_id, attendance_id, start_time, start_photo) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(attendance.id)
        .bind(Utc::now())
        .bind(&photo)
        .fetch_one(self.pool)
        .await?;

        Ok(break_row)
    }

    /// Close the active break and add its duration to the day's attendance
    /// counter. Both writes commit or roll back together.
    pub async fn end_break(
        &self,
        user_id: i32,
        face_verified: bool,
        photo: Option<String>,
    ) -> Result<Break, AttendanceError> {
        let user = self.require_user(user_id).await?;
        require_face(&user, face_verified, "ending break")?;

        let active = self
            .find_active_break(user_id)
            .await?
            .ok_or(AttendanceError::NoActiveBreak)?;

        let end_time = Utc::now();
        let duration = break_duration_minutes(active.start_time, end_time);

        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Break>(
            "UPDATE breaks \
             SET end_time = $1, duration = $2, end_photo = $3 \
             WHERE id = $4 \
             RETURNING *",
        )
        .bind(end_time)
        .bind(duration)
        .bind(&photo)
        .bind(active.id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(attendance_id) = active.attendance_id {
            sqlx::query(
                "UPDATE attendance \
                 SET total_break_minutes = total_break_minutes + $1, updated_at = now() \
                 WHERE id = $2",
            )
            .bind(duration)
            .bind(attendance_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(closed)
    }

    pub async fn today(&self, user_id: i32) -> Result<Option<Attendance>, AttendanceError> {
        self.find_by_date(user_id, Local::now().date_naive()).await
    }

    pub async fn today_breaks(&self, user_id: i32) -> Result<TodayBreaks, AttendanceError> {
        let today = Local::now().date_naive();
        let breaks = sqlx::query_as::<_, Break>(
            "SELECT b.* FROM breaks b \
             JOIN attendance a ON a.id = b.attendance_id \
             WHERE b.user_id = $1 AND a.date = $2 \
             ORDER BY b.start_time ASC",
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(self.pool)
        .await?;

        let total_minutes = breaks.iter().filter_map(|b| b.duration).sum();
        let active_break = breaks.iter().find(|b| b.end_time.is_none()).cloned();

        Ok(TodayBreaks {
            breaks,
            total_minutes,
            active_break,
        })
    }

    pub async fn history(
        &self,
        user_id: i32,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Attendance>, i64), AttendanceError> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE user_id = $1 \
             ORDER BY date DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM attendance WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        Ok((rows, total))
    }

    pub async fn monthly_statistics(
        &self,
        user_id: i32,
        year: i32,
        month: u32,
    ) -> Result<AttendanceStats, AttendanceError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| {
            let today = Local::now().date_naive();
            NaiveDate::from_ymd_opt(today.year(), today.month(), 1).expect("valid date")
        });
        let end = next_month_start(start) - Duration::days(1);

        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE user_id = $1 AND date BETWEEN $2 AND $3",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(summarize(&rows))
    }

    /// Admin view: every attendance row for today, clock-in order
    pub async fn all_today(&self) -> Result<Vec<Attendance>, AttendanceError> {
        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE date = $1 ORDER BY clock_in ASC",
        )
        .bind(Local::now().date_naive())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Admin report filtered by optional date range and user
    pub async fn report(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        user_id: Option<i32>,
    ) -> Result<Vec<Attendance>, AttendanceError> {
        let rows = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance \
             WHERE ($1::date IS NULL OR date >= $1) \
               AND ($2::date IS NULL OR date <= $2) \
               AND ($3::integer IS NULL OR user_id = $3) \
             ORDER BY date DESC, clock_in ASC",
        )
        .bind(start_date)
        .bind(end_date)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn break_history(
        &self,
        user_id: i32,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Break>, i64), AttendanceError> {
        let offset = (page.max(1) - 1) * limit;
        let rows = sqlx::query_as::<_, Break>(
            "SELECT * FROM breaks WHERE user_id = $1 \
             ORDER BY start_time DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM breaks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn require_user(&self, user_id: i32) -> Result<User, AttendanceError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(AttendanceError::UserNotFound)
    }

    async fn find_by_date(
        &self,
        user_id: i32,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, AttendanceError> {
        let row = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE user_id = $1 AND date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Today's clocked-in-but-not-out row, if any
    async fn find_open_session(&self, user_id: i32) -> Result<Option<Attendance>, AttendanceError> {
        let row = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance \
             WHERE user_id = $1 AND date = $2 AND clock_out IS NULL",
        )
        .bind(user_id)
        .bind(Local::now().date_naive())
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn find_active_break(&self, user_id: i32) -> Result<Option<Break>, AttendanceError> {
        let row = sqlx::query_as::<_, Break>(
            "SELECT * FROM breaks WHERE user_id = $1 AND end_time IS NULL",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}

fn require_face(user: &User, face_verified: bool, action: &'static str) -> Result<(), AttendanceError> {
    if user.face_registered && !face_verified {
        return Err(AttendanceError::FaceVerificationRequired(action));
    }
    Ok(())
}

/// Config work-start wins, then the user's personal start time, then 09:00
fn pick_work_start(config: &CompanyConfig, user: &User) -> String {
    if !config.work_start_time.trim().is_empty() {
        config.work_start_time.clone()
    } else if !user.start_work_time.trim().is_empty() {
        user.start_work_time.clone()
    } else {
        CompanyConfig::DEFAULT_WORK_START.to_string()
    }
}

/// A concurrent duplicate clock-in loses the UNIQUE(user_id, date) race;
/// report it as the same business conflict as the pre-check.
fn map_unique_to_already_clocked_in(err: sqlx::Error) -> AttendanceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return AttendanceError::AlreadyClockedIn;
        }
    }
    AttendanceError::Database(err)
}

fn next_month_start(date: NaiveDate) -> NaiveDate {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).expect("valid date")
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1).expect("valid date")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn on_time_clock_in_is_present() {
        let status = resolve_clock_in_status(None, at(8, 55, 0), "09:00", 15);
        assert_eq!(status, AttendanceStatus::Present);
    }

    #[test]
    fn within_grace_period_is_present() {
        let status = resolve_clock_in_status(None, at(9, 14, 59), "09:00", 15);
        assert_eq!(status, AttendanceStatus::Present);
    }

    #[test]
    fn exactly_on_deadline_is_present() {
        // Boundary is strictly greater-than: 09:15:00 sharp still passes
        let status = resolve_clock_in_status(None, at(9, 15, 0), "09:00", 15);
        assert_eq!(status, AttendanceStatus::Present);
    }

    #[test]
    fn past_deadline_is_late() {
        let status = resolve_clock_in_status(None, at(9, 15, 1), "09:00", 15);
        assert_eq!(status, AttendanceStatus::Late);
    }

    #[test]
    fn forced_status_skips_late_check() {
        let status =
            resolve_clock_in_status(Some(AttendanceStatus::Sick), at(13, 0, 0), "09:00", 15);
        assert_eq!(status, AttendanceStatus::Sick);
    }

    #[test]
    fn grace_minutes_can_roll_past_the_hour() {
        // 08:50 start + 15 minutes puts the deadline at 09:05
        assert_eq!(
            resolve_clock_in_status(None, at(9, 4, 0), "08:50", 15),
            AttendanceStatus::Present
        );
        assert_eq!(
            resolve_clock_in_status(None, at(9, 6, 0), "08:50", 15),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn malformed_work_start_falls_back_to_nine() {
        assert_eq!(parse_work_start("garbage"), (9, 0));
        assert_eq!(parse_work_start("25:00"), (9, 0));
        assert_eq!(parse_work_start("08:30"), (8, 30));
    }

    #[test]
    fn break_duration_rounds_to_nearest_minute() {
        let start = Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap();
        assert_eq!(
            break_duration_minutes(start, start + Duration::minutes(17)),
            17
        );
        // 29 seconds rounds down, 31 rounds up
        assert_eq!(
            break_duration_minutes(start, start + Duration::minutes(10) + Duration::seconds(29)),
            10
        );
        assert_eq!(
            break_duration_minutes(start, start + Duration::minutes(10) + Duration::seconds(31)),
            11
        );
    }

    fn row(status: AttendanceStatus, break_minutes: i32) -> Attendance {
        Attendance {
            id: 1,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            clock_in: None,
            clock_out: None,
            clock_in_photo: None,
            clock_out_photo: None,
            status,
            latitude: None,
            longitude: None,
            total_break_minutes: break_minutes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn statistics_bucket_all_six_statuses() {
        let rows = vec![
            row(AttendanceStatus::Present, 30),
            row(AttendanceStatus::Present, 0),
            row(AttendanceStatus::Late, 15),
            row(AttendanceStatus::Absent, 0),
            row(AttendanceStatus::Sick, 0),
            row(AttendanceStatus::Leave, 0),
            row(AttendanceStatus::Alpha, 0),
        ];
        let stats = summarize(&rows);
        assert_eq!(stats.total_days, 7);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.sick, 1);
        assert_eq!(stats.leave, 1);
        assert_eq!(stats.alpha, 1);
        assert_eq!(stats.total_break_minutes, 45);
    }

    #[test]
    fn month_end_calculation() {
        assert_eq!(
            next_month_start(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(
            next_month_start(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}
