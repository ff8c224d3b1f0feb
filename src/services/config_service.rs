use sqlx::PgPool;

use crate::database::models::company_config::CompanyConfig;

/// Fields an admin may change; `None` leaves the stored value untouched
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub company_name: Option<String>,
    pub max_break_minutes_per_day: Option<i32>,
    pub late_threshold_minutes: Option<i32>,
    pub overtime_rate_multiplier: Option<f64>,
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
}

/// Fetch the tenant's config singleton, inserting the defaults on first read
pub async fn get_or_create(pool: &PgPool) -> Result<CompanyConfig, sqlx::Error> {
    if let Some(config) =
        sqlx::query_as::<_, CompanyConfig>("SELECT * FROM company_config ORDER BY id LIMIT 1")
            .fetch_optional(pool)
            .await?
    {
        return Ok(config);
    }

    sqlx::query_as::<_, CompanyConfig>(
        "INSERT INTO company_config \
            (company_name, max_break_minutes_per_day, late_threshold_minutes, \
             overtime_rate_multiplier, work_start_time, work_end_time) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(CompanyConfig::DEFAULT_COMPANY_NAME)
    .bind(CompanyConfig::DEFAULT_MAX_BREAK_MINUTES)
    .bind(CompanyConfig::DEFAULT_LATE_THRESHOLD_MINUTES)
    .bind(CompanyConfig::DEFAULT_OVERTIME_RATE)
    .bind(CompanyConfig::DEFAULT_WORK_START)
    .bind(CompanyConfig::DEFAULT_WORK_END)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, changes: ConfigUpdate) -> Result<CompanyConfig, sqlx::Error> {
    let current = get_or_create(pool).await?;

    sqlx::query_as::<_, CompanyConfig>(
        "UPDATE company_config SET \
            company_name = $1, \
            max_break_minutes_per_day = $2, \
            late_threshold_minutes = $3, \
            overtime_rate_multiplier = $4, \
            work_start_time = $5, \
            work_end_time = $6, \
            updated_at = now() \
         WHERE id = $7 \
         RETURNING *",
    )
    .bind(changes.company_name.unwrap_or(current.company_name))
    .bind(
        changes
            .max_break_minutes_per_day
            .unwrap_or(current.max_break_minutes_per_day),
    )
    .bind(
        changes
            .late_threshold_minutes
            .unwrap_or(current.late_threshold_minutes),
    )
    .bind(
        changes
            .overtime_rate_multiplier
            .unwrap_or(current.overtime_rate_multiplier),
    )
    .bind(changes.work_start_time.unwrap_or(current.work_start_time))
    .bind(changes.work_end_time.unwrap_or(current.work_end_time))
    .bind(current.id)
    .fetch_one(pool)
    .await
}
