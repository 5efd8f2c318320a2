use crate::reviews::{Review, ServiceError};
use sqlx::PgPool;

const REVIEW_COLUMNS: &str = "id, user_id, course_id, rating, comment, created_at, updated_at";

/// Repository for database operations on reviews
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i32,
        course_id: i32,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (user_id, course_id, rating, comment)
             VALUES ($1, $2, $3, $4)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(user_id)
        .bind(course_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Review>, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Find a review by user_id and course_id (for duplicate detection)
    pub async fn find_by_user_and_course(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> Result<Option<Review>, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn update(
        &self,
        id: i32,
        rating: Option<i16>,
        comment: Option<String>,
    ) -> Result<Review, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews
             SET rating = COALESCE($1, rating),
                 comment = COALESCE($2, comment),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(rating)
        .bind(comment)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn find_by_course(&self, course_id: i32) -> Result<Vec<Review>, ServiceError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE course_id = $1 ORDER BY created_at DESC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    pub async fn course_exists(&self, course_id: i32) -> Result<bool, ServiceError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn is_enrolled(&self, user_id: i32, course_id: i32) -> Result<bool, ServiceError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
