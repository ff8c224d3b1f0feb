use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::config;

/// Errors from the partition manager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid tenant schema name: {0}")]
    InvalidSchemaName(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Shared directory schema holding the tenant registry and super admins.
pub const PUBLIC_SCHEMA: &str = "public";

/// Connection pool registry for the shared directory schema and per-tenant
/// schemas. All entity tables are schema-identical but physically isolated
/// per tenant; a pool is created lazily the first time a schema is touched
/// and reused for the process lifetime.
///
/// Held in the axum application state and cloned per request (clones share
/// the same underlying map).
#[derive(Clone)]
pub struct PartitionManager {
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
    // Serializes pool creation so a first-access race on the same schema
    // resolves to a single pool instance.
    init_lock: Arc<Mutex<()>>,
}

impl PartitionManager {
    pub fn new() -> Self {
        Self {
            pools: Arc::new(RwLock::new(HashMap::new())),
            init_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the pool for the shared directory schema
    pub async fn public_pool(&self) -> Result<PgPool, DatabaseError> {
        self.get_pool(PUBLIC_SCHEMA).await
    }

    /// Get a tenant schema pool (validated name)
    pub async fn tenant_pool(&self, schema_name: &str) -> Result<PgPool, DatabaseError> {
        if !Self::is_valid_schema_name(schema_name) {
            return Err(DatabaseError::InvalidSchemaName(schema_name.to_string()));
        }
        self.get_pool(schema_name).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, schema_name: &str) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(schema_name) {
                return Ok(pool.clone());
            }
        }

        let _guard = self.init_lock.lock().await;

        // Re-check: another task may have created the pool while we waited
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(schema_name) {
                return Ok(pool.clone());
            }
        }

        let options = Self::connect_options(schema_name)?;
        let db_config = &config::config().database;

        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        {
            let mut pools = self.pools.write().await;
            pools.insert(schema_name.to_string(), pool.clone());
        }

        info!("Created connection pool for schema: {}", schema_name);
        Ok(pool)
    }

    /// Build connection options from DATABASE_URL with search_path pinned to
    /// the given schema, so every query on the pool is isolated to that
    /// tenant's tables.
    fn connect_options(schema_name: &str) -> Result<PgConnectOptions, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let options =
            PgConnectOptions::from_str(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        Ok(options.options([("search_path", schema_name)]))
    }

    /// Pings the directory pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.public_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Drop a cached pool (after a tenant schema is destroyed)
    pub async fn evict(&self, schema_name: &str) {
        let removed = {
            let mut pools = self.pools.write().await;
            pools.remove(schema_name)
        };
        if let Some(pool) = removed {
            pool.close().await;
            info!("Closed connection pool for schema: {}", schema_name);
        }
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed connection pool for schema: {}", name);
        }
    }

    /// Validate schema names to prevent injection. Accepts:
    /// - exact "public" (directory schema)
    /// - names starting with "tenant_" followed by [a-zA-Z0-9_]+
    pub fn is_valid_schema_name(name: &str) -> bool {
        if name == PUBLIC_SCHEMA {
            return true;
        }
        match name.strip_prefix("tenant_") {
            Some(rest) => {
                !rest.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        }
    }

    /// Quote SQL identifier for DDL that interpolates schema names
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

impl Default for PartitionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_schema_names() {
        assert!(PartitionManager::is_valid_schema_name("public"));
        assert!(PartitionManager::is_valid_schema_name("tenant_1"));
        assert!(PartitionManager::is_valid_schema_name("tenant_123abc_DEF"));
        assert!(!PartitionManager::is_valid_schema_name("tenant_"));
        assert!(!PartitionManager::is_valid_schema_name("pg_catalog"));
        assert!(!PartitionManager::is_valid_schema_name("tenant-123"));
        assert!(!PartitionManager::is_valid_schema_name("tenant_1; DROP SCHEMA x"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(PartitionManager::quote_identifier("tenant_7"), "\"tenant_7\"");
        assert_eq!(PartitionManager::quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
