use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password;
use crate::database::manager::{DatabaseError, PartitionManager};
use crate::database::models::tenant::{Tenant, TenantSummary};

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant not found")]
    NotFound,

    #[error("Tenant is deactivated")]
    Inactive,

    #[error("Tenant already exists: {0}")]
    DuplicateName(String),

    #[error("Invalid tenant name: {0}")]
    InvalidName(String),

    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Partition manager error: {0}")]
    Manager(#[from] DatabaseError),
}

/// Tenant Directory: the registry in the shared schema mapping tenant id to
/// its isolated schema and active flag, plus schema provisioning.
pub struct TenantService {
    partitions: PartitionManager,
}

impl TenantService {
    pub fn new(partitions: PartitionManager) -> Self {
        Self { partitions }
    }

    /// Resolve a tenant id to its directory row, failing on unknown or
    /// deactivated tenants. Every tenant-scoped request goes through this.
    pub async fn resolve(&self, tenant_id: i32) -> Result<Tenant, TenantError> {
        let tenant = self.get(tenant_id).await?.ok_or(TenantError::NotFound)?;
        if !tenant.is_active {
            return Err(TenantError::Inactive);
        }
        Ok(tenant)
    }

    pub async fn get(&self, tenant_id: i32) -> Result<Option<Tenant>, TenantError> {
        let pool = self.partitions.public_pool().await?;
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, schema_name, is_active, created_at FROM tenants WHERE id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&pool)
        .await?;
        Ok(tenant)
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, TenantError> {
        let pool = self.partitions.public_pool().await?;
        let tenants = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, schema_name, is_active, created_at FROM tenants \
             ORDER BY created_at DESC",
        )
        .fetch_all(&pool)
        .await?;
        Ok(tenants)
    }

    /// Active tenants as id + display name, for the public company picker
    pub async fn list_active_summaries(&self) -> Result<Vec<TenantSummary>, TenantError> {
        let pool = self.partitions.public_pool().await?;
        let tenants = sqlx::query_as::<_, TenantSummary>(
            "SELECT id, name FROM tenants WHERE is_active = TRUE ORDER BY name ASC",
        )
        .fetch_all(&pool)
        .await?;
        Ok(tenants)
    }

    /// Provision a new tenant: directory row, fresh schema with the full
    /// entity DDL, one ADMIN user and a default company config.
    ///
    /// Not atomic across steps: a failure partway leaves a half-provisioned
    /// tenant. The login sweep skips partitions that fail to answer, so a
    /// broken tenant does not block anyone else.
    pub async fn provision(
        &self,
        name: &str,
        admin_email: &str,
        admin_password: &str,
        admin_name: &str,
    ) -> Result<Tenant, TenantError> {
        Self::validate_name(name)?;

        let pool = self.partitions.public_pool().await?;

        // The schema name derives from the tenant id, so the id is drawn
        // from the sequence up front and the directory row is inserted with
        // its final schema name in a single statement. No placeholder row
        // ever exists, so a crash here strands nothing.
        let (next_id,): (i64,) =
            sqlx::query_as("SELECT nextval(pg_get_serial_sequence('tenants', 'id'))")
                .fetch_one(&pool)
                .await?;
        let tenant_id = next_id as i32;
        let schema_name = Self::derived_schema_name(tenant_id);

        let tenant = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (id, name, schema_name, is_active) \
             VALUES ($1, $2, $3, TRUE) \
             RETURNING id, name, schema_name, is_active, created_at",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(&schema_name)
        .fetch_one(&pool)
        .await
        .map_err(|e| Self::map_duplicate(e, name))?;

        self.provision_schema(&pool, &schema_name).await?;
        self.create_admin(&schema_name, admin_email, admin_password, admin_name)
            .await?;
        self.create_default_config(&schema_name, name).await?;

        info!("Provisioned tenant {} (schema {})", tenant.id, schema_name);
        Ok(tenant)
    }

    /// Irreversibly destroy a tenant: cascading schema drop, then the
    /// directory row.
    pub async fn deprovision(&self, tenant_id: i32) -> Result<Tenant, TenantError> {
        let tenant = self.get(tenant_id).await?.ok_or(TenantError::NotFound)?;

        let pool = self.partitions.public_pool().await?;
        let quoted = PartitionManager::quote_identifier(&tenant.schema_name);
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", quoted))
            .execute(&pool)
            .await?;

        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .execute(&pool)
            .await?;

        // The cached pool points at a schema that no longer exists
        self.partitions.evict(&tenant.schema_name).await;

        warn!("Deprovisioned tenant {} (schema {})", tenant.id, tenant.schema_name);
        Ok(tenant)
    }

    /// Toggle the active flag only; tenant data is untouched
    pub async fn set_active(&self, tenant_id: i32, active: bool) -> Result<Tenant, TenantError> {
        let pool = self.partitions.public_pool().await?;
        sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET is_active = $1 WHERE id = $2 \
             RETURNING id, name, schema_name, is_active, created_at",
        )
        .bind(active)
        .bind(tenant_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(TenantError::NotFound)
    }

    /// Bootstrap the shared directory schema (tenants + super_admins).
    /// Idempotent; run once at startup.
    pub async fn ensure_directory_schema(&self) -> Result<(), TenantError> {
        let pool = self.partitions.public_pool().await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tenants (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                schema_name VARCHAR(63) NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS super_admins (
                id SERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password VARCHAR(255) NOT NULL,
                name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&pool)
        .await?;

        Ok(())
    }

    /// Create the schema plus the enum types and entity tables inside it.
    /// DDL interpolates the (validated, quoted) schema name because DDL
    /// cannot take bind parameters.
    async fn provision_schema(&self, pool: &PgPool, schema_name: &str) -> Result<(), TenantError> {
        if !PartitionManager::is_valid_schema_name(schema_name) {
            return Err(TenantError::InvalidName(schema_name.to_string()));
        }
        let q = PartitionManager::quote_identifier(schema_name);

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", q))
            .execute(pool)
            .await?;

        let enums: [(&str, &str); 4] = [
            ("role", "'ADMIN', 'LEADER', 'USER'"),
            ("salary_type", "'HOURLY', 'DAILY', 'WEEKLY', 'MONTHLY'"),
            (
                "attendance_status",
                "'PRESENT', 'LATE', 'ABSENT', 'SICK', 'LEAVE', 'ALPHA'",
            ),
            ("task_status", "'PENDING', 'IN_PROGRESS', 'DONE'"),
        ];
        for (name, values) in enums {
            sqlx::query(&format!(
                "DO $$ BEGIN CREATE TYPE {}.{} AS ENUM ({}); \
                 EXCEPTION WHEN duplicate_object THEN NULL; END $$;",
                q, name, values
            ))
            .execute(pool)
            .await?;
        }

        let tables = [
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.company_config (
                    id SERIAL PRIMARY KEY,
                    company_name VARCHAR(255) NOT NULL DEFAULT 'My Company',
                    max_break_minutes_per_day INTEGER NOT NULL DEFAULT 60,
                    late_threshold_minutes INTEGER NOT NULL DEFAULT 15,
                    overtime_rate_multiplier DOUBLE PRECISION NOT NULL DEFAULT 1.5,
                    work_start_time VARCHAR(10) NOT NULL DEFAULT '09:00',
                    work_end_time VARCHAR(10) NOT NULL DEFAULT '17:00',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.users (
                    id SERIAL PRIMARY KEY,
                    email VARCHAR(255) NOT NULL UNIQUE,
                    password VARCHAR(255) NOT NULL,
                    name VARCHAR(255) NOT NULL,
                    role {q}.role NOT NULL DEFAULT 'USER',
                    photo VARCHAR(255),
                    face_descriptor TEXT,
                    face_registered BOOLEAN NOT NULL DEFAULT FALSE,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    salary_type {q}.salary_type NOT NULL DEFAULT 'MONTHLY',
                    salary DOUBLE PRECISION NOT NULL DEFAULT 0,
                    start_work_time VARCHAR(10) NOT NULL DEFAULT '09:00',
                    late_penalty DOUBLE PRECISION NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.attendance (
                    id SERIAL PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES {q}.users(id) ON DELETE CASCADE,
                    date DATE NOT NULL DEFAULT CURRENT_DATE,
                    clock_in TIMESTAMPTZ,
                    clock_out TIMESTAMPTZ,
                    clock_in_photo VARCHAR(255),
                    clock_out_photo VARCHAR(255),
                    status {q}.attendance_status NOT NULL DEFAULT 'PRESENT',
                    latitude DOUBLE PRECISION,
                    longitude DOUBLE PRECISION,
                    total_break_minutes INTEGER NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    UNIQUE(user_id, date)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.breaks (
                    id SERIAL PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES {q}.users(id) ON DELETE CASCADE,
                    attendance_id INTEGER REFERENCES {q}.attendance(id) ON DELETE SET NULL,
                    start_time TIMESTAMPTZ NOT NULL,
                    end_time TIMESTAMPTZ,
                    duration INTEGER,
                    start_photo VARCHAR(255),
                    end_photo VARCHAR(255),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.tasks (
                    id SERIAL PRIMARY KEY,
                    title VARCHAR(255) NOT NULL,
                    description TEXT NOT NULL,
                    assignee_id INTEGER NOT NULL REFERENCES {q}.users(id) ON DELETE CASCADE,
                    creator_id INTEGER NOT NULL REFERENCES {q}.users(id) ON DELETE CASCADE,
                    status {q}.task_status NOT NULL DEFAULT 'PENDING',
                    due_date TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {q}.payrolls (
                    id SERIAL PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES {q}.users(id) ON DELETE CASCADE,
                    period_start TIMESTAMPTZ NOT NULL,
                    period_end TIMESTAMPTZ NOT NULL,
                    base_salary DOUBLE PRECISION NOT NULL,
                    working_days INTEGER NOT NULL DEFAULT 0,
                    working_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
                    overtime_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
                    late_deductions DOUBLE PRECISION NOT NULL DEFAULT 0,
                    break_deductions DOUBLE PRECISION NOT NULL DEFAULT 0,
                    overtime_bonus DOUBLE PRECISION NOT NULL DEFAULT 0,
                    deductions DOUBLE PRECISION NOT NULL,
                    net_salary DOUBLE PRECISION NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ),
        ];
        for ddl in &tables {
            sqlx::query(ddl).execute(pool).await?;
        }

        Ok(())
    }

    async fn create_admin(
        &self,
        schema_name: &str,
        email: &str,
        plaintext_password: &str,
        name: &str,
    ) -> Result<(), TenantError> {
        let digest = password::hash(plaintext_password).await?;
        let pool = self.partitions.tenant_pool(schema_name).await?;

        sqlx::query(
            "INSERT INTO users (email, password, name, role, is_active) \
             VALUES ($1, $2, $3, 'ADMIN', TRUE)",
        )
        .bind(email)
        .bind(digest)
        .bind(name)
        .execute(&pool)
        .await?;

        Ok(())
    }

    async fn create_default_config(
        &self,
        schema_name: &str,
        company_name: &str,
    ) -> Result<(), TenantError> {
        let pool = self.partitions.tenant_pool(schema_name).await?;

        let existing: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM company_config ORDER BY id LIMIT 1")
                .fetch_optional(&pool)
                .await?;

        match existing {
            Some((id,)) => {
                sqlx::query("UPDATE company_config SET company_name = $1, updated_at = now() WHERE id = $2")
                    .bind(company_name)
                    .bind(id)
                    .execute(&pool)
                    .await?;
            }
            None => {
                sqlx::query("INSERT INTO company_config (company_name) VALUES ($1)")
                    .bind(company_name)
                    .execute(&pool)
                    .await?;
            }
        }

        Ok(())
    }

    fn derived_schema_name(tenant_id: i32) -> String {
        format!("tenant_{}", tenant_id)
    }

    fn validate_name(name: &str) -> Result<(), TenantError> {
        if name.trim().len() < 2 {
            return Err(TenantError::InvalidName(
                "Tenant name must be at least 2 characters".to_string(),
            ));
        }
        if name.len() > 100 {
            return Err(TenantError::InvalidName(
                "Tenant name must be less than 100 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn map_duplicate(err: sqlx::Error, name: &str) -> TenantError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return TenantError::DuplicateName(name.to_string());
            }
        }
        TenantError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_long_names() {
        assert!(matches!(
            TenantService::validate_name("a"),
            Err(TenantError::InvalidName(_))
        ));
        assert!(matches!(
            TenantService::validate_name(&"x".repeat(101)),
            Err(TenantError::InvalidName(_))
        ));
        assert!(TenantService::validate_name("Acme Corp").is_ok());
    }

    #[test]
    fn derived_schema_names_pass_the_partition_validator() {
        for id in [1, 42, i32::MAX] {
            let schema = TenantService::derived_schema_name(id);
            assert!(PartitionManager::is_valid_schema_name(&schema), "{}", schema);
        }
    }
}
