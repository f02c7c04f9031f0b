//! PostgreSQL repository implementations

pub mod job_repository;

pub use job_repository::PostgresJobRepository;

use sqlx::{Pool, Postgres};

/// Create PostgreSQL connection pool
pub async fn create_pool(
    host: &str,
    port: u16,
    database: &str,
    username: &str,
    password: &str,
    pool_size: u32,
) -> crate::Result<Pool<Postgres>> {
    use sqlx::postgres::PgPoolOptions;

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        username, password, host, port, database
    );

    tracing::info!("Connecting to PostgreSQL at {}:{}/{}...", host, port, database);

    let pool = PgPoolOptions::new()
        .max_connections(pool_size)
        .connect(&database_url)
        .await?;

    tracing::info!("PostgreSQL connected successfully");
    Ok(pool)
}
