// Append-only activity log over the activities table

use crate::activity::models::{Activity, ActivityType};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivityLog {
    pool: PgPool,
}

impl ActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry. Callers treat this as best-effort: a failed log
    /// write must never fail the action it describes, so this logs and
    /// swallows errors.
    pub async fn record(
        &self,
        user_id: i32,
        activity_type: ActivityType,
        course_id: Option<i32>,
        lesson_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO activities (user_id, activity_type, course_id, lesson_id, metadata) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(activity_type)
        .bind(course_id)
        .bind(lesson_id)
        .bind(metadata)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                "Failed to record {} activity for user {}: {}",
                activity_type,
                user_id,
                e
            );
        }
    }

    /// Most recent entries for a user, newest first
    pub async fn recent_for_user(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            "SELECT id, user_id, activity_type, course_id, lesson_id, metadata, created_at \
             FROM activities WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
