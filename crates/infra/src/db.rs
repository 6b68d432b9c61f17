//! Database wiring: connection pool, schema migration and error mapping.

use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use warden_core::AuthError;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// Open a pool and verify connectivity.
pub async fn create_pool(config: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await
        .context("failed to connect to database")?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Apply the schema. Every statement is `IF NOT EXISTS`, so this is safe to
/// run on every start.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("failed to apply database schema")?;
    tracing::info!("database schema applied");
    Ok(())
}

/// Map a driver error into the domain taxonomy, tagging it with the
/// operation that failed.
///
/// | Error | Code | Result |
/// |---|---|---|
/// | unique violation | `23505` | `Conflict` |
/// | foreign key violation | `23503` | `NotFound` |
/// | `RowNotFound` | | `NotFound` |
/// | anything else | | `Storage` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuthError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => AuthError::conflict(format!(
                "{operation}: {}",
                db_err.constraint().unwrap_or("unique constraint violated")
            )),
            Some("23503") => AuthError::not_found(format!("{operation}: referenced record")),
            _ => AuthError::storage(operation, db_err.message()),
        },
        sqlx::Error::RowNotFound => AuthError::not_found(operation.to_string()),
        sqlx::Error::PoolTimedOut => AuthError::storage(operation, "connection pool timed out"),
        sqlx::Error::PoolClosed => AuthError::storage(operation, "connection pool closed"),
        other => AuthError::storage(operation, other),
    }
}
