use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a PostgreSQL connection pool.
///
/// `max_connections` / `min_connections` map directly to
/// `AppConfig::db_max_connections` / `db_min_connections`.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, min_connections, "Connected to PostgreSQL");
    Ok(pool)
}
