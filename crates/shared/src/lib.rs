//! Storefront shared infrastructure
//!
//! Database pool construction and embedded schema migrations used by the API server.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Default number of pooled connections for the API server
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Create the connection pool used for regular queries.
///
/// `acquire_timeout` bounds how long a request waits for a free connection.
pub async fn create_pool(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    tracing::info!(
        max_connections = DEFAULT_MAX_CONNECTIONS,
        acquire_timeout_secs = acquire_timeout.as_secs(),
        "Database pool created"
    );
    Ok(pool)
}

/// Apply the embedded migrations in `crates/shared/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
