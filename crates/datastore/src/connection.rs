use crate::error::StoreError;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// Reads `DATABASE_URL` from the environment (loading `.env` if present) and
/// returns a pool that can be shared across the whole application.
pub async fn connect() -> Result<PgPool, StoreError> {
    // A missing .env file is fine; the variable may come from the environment.
    let _ = dotenv();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| StoreError::ConnectionConfig("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    Ok(pool)
}

/// Applies database migrations, ensuring the schema is up-to-date before the
/// first pipeline run.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
