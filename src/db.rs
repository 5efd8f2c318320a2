use crate::error::ApiError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Check if a course with the given slug already exists
pub async fn check_duplicate_slug(pool: &PgPool, slug: &str) -> Result<bool, ApiError> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await?;

    Ok(exists.unwrap_or(false))
}

/// Check if a course slug is taken by a different course.
/// Used on update so a course can keep its own slug.
pub async fn check_duplicate_slug_excluding_id(
    pool: &PgPool,
    slug: &str,
    exclude_id: i32,
) -> Result<bool, ApiError> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE slug = $1 AND id != $2)")
            .bind(slug)
            .bind(exclude_id)
            .fetch_one(pool)
            .await?;

    Ok(exists.unwrap_or(false))
}
