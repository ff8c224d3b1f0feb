use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::attendance::{Attendance, AttendanceStatus};
use crate::database::models::company_config::CompanyConfig;
use crate::database::models::payroll::Payroll;
use crate::database::models::user::{SalaryType, User};
use crate::services::config_service;

#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("User not found")]
    UserNotFound,

    #[error("Payroll not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything the calculator derives from one period. All intermediate
/// figures are kept and persisted for audit, not just the net.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollFigures {
    pub working_days: i32,
    pub working_hours: f64,
    pub late_count: i32,
    pub total_break_minutes: i64,
    pub base_salary: f64,
    pub late_deductions: f64,
    pub overtime_hours: f64,
    pub overtime_bonus: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

const STANDARD_HOURS_PER_DAY: f64 = 8.0;

impl SalaryType {
    /// Rate divisor used when converting the configured salary into an
    /// hourly-equivalent figure for overtime purposes
    fn hourly_equivalent(self, rate: f64) -> f64 {
        match self {
            SalaryType::Monthly => rate / 160.0,
            SalaryType::Daily => rate / 8.0,
            SalaryType::Weekly => rate / 40.0,
            SalaryType::Hourly => rate,
        }
    }
}

/// Pure payroll computation over a period's attendance rows.
///
/// Only rows with both clock-in and clock-out contribute; rows missing
/// either timestamp are excluded from every sum (not counted as absent or
/// partial). Base pay follows the salary type, overtime is paid on hours
/// beyond 8 per worked day at the hourly-equivalent rate times the tenant's
/// multiplier, and the only deduction charged is the per-occurrence late
/// penalty (break deductions stay reserved at zero).
pub fn compute_payroll(
    salary_type: SalaryType,
    salary: f64,
    late_penalty: f64,
    overtime_rate: f64,
    attendances: &[Attendance],
) -> PayrollFigures {
    let mut working_days = 0i32;
    let mut working_hours = 0f64;
    let mut late_count = 0i32;
    let mut total_break_minutes = 0i64;

    for attendance in attendances {
        let (Some(clock_in), Some(clock_out)) = (attendance.clock_in, attendance.clock_out) else {
            continue;
        };
        working_days += 1;
        working_hours += (clock_out - clock_in).num_milliseconds() as f64 / 3_600_000.0;
        if attendance.status == AttendanceStatus::Late {
            late_count += 1;
        }
        total_break_minutes += attendance.total_break_minutes as i64;
    }

    let base_salary = match salary_type {
        SalaryType::Hourly => salary * working_hours,
        SalaryType::Daily => salary * working_days as f64,
        SalaryType::Weekly => salary * (working_days as f64 / 7.0).ceil(),
        SalaryType::Monthly => salary,
    };

    let late_deductions = late_count as f64 * late_penalty;

    let expected_hours = working_days as f64 * STANDARD_HOURS_PER_DAY;
    let overtime_hours = (working_hours - expected_hours).max(0.0);
    let overtime_bonus = overtime_hours * salary_type.hourly_equivalent(salary) * overtime_rate;

    let total_deductions = late_deductions;
    let net_salary = base_salary + overtime_bonus - total_deductions;

    PayrollFigures {
        working_days,
        working_hours,
        late_count,
        total_break_minutes,
        base_salary,
        late_deductions,
        overtime_hours,
        overtime_bonus,
        total_deductions,
        net_salary,
    }
}

/// Payroll calculator bound to one tenant's pool
pub struct PayrollService<'a> {
    pool: &'a PgPool,
}

impl<'a> PayrollService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Aggregate the user's attendance over [period_start, period_end]
    /// inclusive and persist an immutable payroll row.
    ///
    /// Deliberately permissive: neither a reversed period nor overlap with a
    /// previously generated payroll is rejected; callers own the range.
    pub async fn generate(
        &self,
        user_id: i32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Payroll, PayrollError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(PayrollError::UserNotFound)?;

        let overtime_rate = config_service::get_or_create(self.pool)
            .await
            .map(|c| c.overtime_rate_multiplier)
            .unwrap_or(CompanyConfig::DEFAULT_OVERTIME_RATE);

        let attendances = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance \
             WHERE user_id = $1 AND date BETWEEN $2::timestamptz::date AND $3::timestamptz::date",
        )
        .bind(user_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(self.pool)
        .await?;

        let figures = compute_payroll(
            user.salary_type,
            user.salary,
            user.late_penalty,
            overtime_rate,
            &attendances,
        );

        let payroll = sqlx::query_as::<_, Payroll>(
            "INSERT INTO payrolls \
             (user_id, period_start, period_end, base_salary, working_days, working_hours, \
              overtime_hours, late_deductions, break_deductions, overtime_bonus, deductions, \
              net_salary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, $11) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(period_start)
        .bind(period_end)
        .bind(figures.base_salary)
        .bind(figures.working_days)
        .bind(figures.working_hours)
        .bind(figures.overtime_hours)
        .bind(figures.late_deductions)
        .bind(figures.overtime_bonus)
        .bind(figures.total_deductions)
        .bind(figures.net_salary)
        .fetch_one(self.pool)
        .await?;

        Ok(payroll)
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<Payroll>, PayrollError> {
        let rows = sqlx::query_as::<_, Payroll>(
            "SELECT * FROM payrolls WHERE user_id = $1 ORDER BY period_end DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list(
        &self,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Payroll>, PayrollError> {
        let rows = sqlx::query_as::<_, Payroll>(
            "SELECT * FROM payrolls \
             WHERE ($1::timestamptz IS NULL OR period_start >= $1) \
               AND ($2::timestamptz IS NULL OR period_end <= $2) \
             ORDER BY period_end DESC",
        )
        .bind(period_start)
        .bind(period_end)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i32) -> Result<Payroll, PayrollError> {
        sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(PayrollError::NotFound)
    }

    pub async fn delete(&self, id: i32) -> Result<(), PayrollError> {
        let result = sqlx::query("DELETE FROM payrolls WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PayrollError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn worked_day(date: NaiveDate, hours: f64, status: AttendanceStatus) -> Attendance {
        let clock_in = Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        Attendance {
            id: 0,
            user_id: 1,
            date,
            clock_in: Some(clock_in),
            clock_out: Some(clock_in + Duration::milliseconds((hours * 3_600_000.0) as i64)),
            clock_in_photo: None,
            clock_out_photo: None,
            status,
            latitude: None,
            longitude: None,
            total_break_minutes: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn open_day(date: NaiveDate) -> Attendance {
        let mut row = worked_day(date, 8.0, AttendanceStatus::Present);
        row.clock_out = None;
        row
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn monthly_salary_with_one_late_day() {
        // 20 full 8-hour days, one of them late: flat monthly base, a single
        // late penalty, no overtime
        let rows: Vec<Attendance> = (1..=20)
            .map(|d| {
                let status = if d == 1 {
                    AttendanceStatus::Late
                } else {
                    AttendanceStatus::Present
                };
                worked_day(date(d), 8.0, status)
            })
            .collect();

        let figures =
            compute_payroll(SalaryType::Monthly, 5_000_000.0, 50_000.0, 1.5, &rows);

        assert_eq!(figures.working_days, 20);
        assert!((figures.working_hours - 160.0).abs() < 1e-9);
        assert_eq!(figures.late_count, 1);
        assert!((figures.base_salary - 5_000_000.0).abs() < 1e-9);
        assert!((figures.late_deductions - 50_000.0).abs() < 1e-9);
        assert!((figures.overtime_hours).abs() < 1e-9);
        assert!((figures.overtime_bonus).abs() < 1e-9);
        assert!((figures.net_salary - 4_950_000.0).abs() < 1e-9);
    }

    #[test]
    fn hourly_salary_with_overtime() {
        // 10 days x 9h = 90h worked against 80h expected: 10h overtime at
        // the raw hourly rate times the 1.5 multiplier
        let rows: Vec<Attendance> = (1..=10)
            .map(|d| worked_day(date(d), 9.0, AttendanceStatus::Present))
            .collect();

        let figures = compute_payroll(SalaryType::Hourly, 50_000.0, 0.0, 1.5, &rows);

        assert_eq!(figures.working_days, 10);
        assert!((figures.working_hours - 90.0).abs() < 1e-9);
        assert!((figures.overtime_hours - 10.0).abs() < 1e-9);
        assert!((figures.base_salary - 4_500_000.0).abs() < 1e-9);
        assert!((figures.overtime_bonus - 750_000.0).abs() < 1e-9);
        assert!((figures.net_salary - 5_250_000.0).abs() < 1e-9);
    }

    #[test]
    fn daily_salary_counts_completed_days_only() {
        let mut rows: Vec<Attendance> = (1..=5)
            .map(|d| worked_day(date(d), 8.0, AttendanceStatus::Present))
            .collect();
        // Still clocked in: excluded from every sum, not treated as partial
        rows.push(open_day(date(6)));

        let figures = compute_payroll(SalaryType::Daily, 200_000.0, 0.0, 1.5, &rows);

        assert_eq!(figures.working_days, 5);
        assert!((figures.base_salary - 1_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_salary_rounds_weeks_up() {
        let rows: Vec<Attendance> = (1..=8)
            .map(|d| worked_day(date(d), 8.0, AttendanceStatus::Present))
            .collect();

        // 8 working days -> ceil(8/7) = 2 weeks
        let figures = compute_payroll(SalaryType::Weekly, 1_000_000.0, 0.0, 1.5, &rows);
        assert!((figures.base_salary - 2_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn overtime_uses_hourly_equivalent_divisors() {
        // One 10-hour day: 2h overtime
        let rows = vec![worked_day(date(1), 10.0, AttendanceStatus::Present)];

        let monthly = compute_payroll(SalaryType::Monthly, 1_600_000.0, 0.0, 2.0, &rows);
        // 1,600,000 / 160 = 10,000/h -> 2h * 10,000 * 2.0
        assert!((monthly.overtime_bonus - 40_000.0).abs() < 1e-9);

        let daily = compute_payroll(SalaryType::Daily, 80_000.0, 0.0, 2.0, &rows);
        // 80,000 / 8 = 10,000/h
        assert!((daily.overtime_bonus - 40_000.0).abs() < 1e-9);

        let weekly = compute_payroll(SalaryType::Weekly, 400_000.0, 0.0, 2.0, &rows);
        // 400,000 / 40 = 10,000/h
        assert!((weekly.overtime_bonus - 40_000.0).abs() < 1e-9);
    }

    // Period bounds are the caller's responsibility: a reversed range or a
    // range overlapping an earlier payroll simply yields whatever rows it
    // matches (none, for a reversed range). This pins that permissiveness.
    #[test]
    fn empty_period_pays_flat_monthly_and_nothing_else() {
        let figures = compute_payroll(SalaryType::Monthly, 3_000_000.0, 50_000.0, 1.5, &[]);
        assert_eq!(figures.working_days, 0);
        assert!((figures.base_salary - 3_000_000.0).abs() < 1e-9);
        assert!((figures.net_salary - 3_000_000.0).abs() < 1e-9);

        let hourly = compute_payroll(SalaryType::Hourly, 50_000.0, 0.0, 1.5, &[]);
        assert!((hourly.base_salary).abs() < 1e-9);
    }

    #[test]
    fn break_minutes_accumulate_from_completed_days() {
        let mut first = worked_day(date(1), 8.0, AttendanceStatus::Present);
        first.total_break_minutes = 17;
        let mut second = worked_day(date(2), 8.0, AttendanceStatus::Present);
        second.total_break_minutes = 17;

        let figures =
            compute_payroll(SalaryType::Monthly, 1_000_000.0, 0.0, 1.5, &[first, second]);
        assert_eq!(figures.total_break_minutes, 34);
    }
}
