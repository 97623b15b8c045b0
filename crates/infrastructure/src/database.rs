use std::env;
use std::time::Duration;

use flowvault_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Embedded schema migrations, including the merge and search procedures.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECONDS: u64 = 5;

/// Connection settings for the workflow runtime store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a caller waits for a pooled connection.
    pub acquire_timeout: Duration,
    /// Per-connection `statement_timeout`, when set.
    pub statement_timeout_ms: Option<u64>,
}

impl DatabaseConfig {
    /// Loads settings from `DATABASE_*` environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let database_url = lookup("DATABASE_URL")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let max_connections = parse_number(&lookup, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        let acquire_timeout_seconds = parse_number(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECONDS);
        let statement_timeout_ms = parse_number(&lookup, "DATABASE_STATEMENT_TIMEOUT_MS")?;

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_seconds),
            statement_timeout_ms,
        })
    }
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).map(|value| value.trim().to_owned()) {
        Some(value) if !value.is_empty() => value.parse::<T>().map(Some).map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        _ => Ok(None),
    }
}

/// Opens a connection pool with the configured limits.
pub async fn connect(config: &DatabaseConfig) -> AppResult<PgPool> {
    let statement_timeout_ms = config.statement_timeout_ms;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .after_connect(move |connection, _metadata| {
            Box::pin(async move {
                if let Some(timeout) = statement_timeout_ms {
                    sqlx::query(format!("SET statement_timeout = {timeout}").as_str())
                        .execute(&mut *connection)
                        .await?;
                }
                Ok(())
            })
        })
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

/// Applies every pending embedded migration.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}

/// Connects and brings the schema up to date.
pub async fn connect_and_migrate(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = connect(config).await?;
    info!(
        max_connections = config.max_connections,
        statement_timeout_ms = config.statement_timeout_ms,
        "database pool ready"
    );

    run_migrations(&pool).await?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "database migrations applied"
    );

    Ok(pool)
}
