// Repository for the achievement catalog, grants, and the aggregate counts
// the rule engine evaluates

use crate::achievements::{error::AchievementError, models::{Achievement, EarnedAchievement}};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AchievementRepository {
    pool: PgPool,
}

impl AchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a catalog entry by its unique code
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Achievement>, AchievementError> {
        let achievement = sqlx::query_as::<_, Achievement>(
            "SELECT id, code, title, description, icon, points FROM achievements WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    /// Full catalog, stable order
    pub async fn list_all(&self) -> Result<Vec<Achievement>, AchievementError> {
        let achievements = sqlx::query_as::<_, Achievement>(
            "SELECT id, code, title, description, icon, points FROM achievements ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    /// Achievements a user has earned, most recent first
    pub async fn list_earned(&self, user_id: i32) -> Result<Vec<EarnedAchievement>, AchievementError> {
        let earned = sqlx::query_as::<_, EarnedAchievement>(
            "SELECT a.code, a.title, a.description, a.icon, a.points, ua.earned_at \
             FROM user_achievements ua \
             JOIN achievements a ON a.id = ua.achievement_id \
             WHERE ua.user_id = $1 \
             ORDER BY ua.earned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(earned)
    }

    /// Idempotent grant: inserts the (user, achievement) pair and reports
    /// whether the row was new. A user can never hold an achievement twice.
    pub async fn grant(&self, user_id: i32, achievement_id: i32) -> Result<bool, AchievementError> {
        let result = sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_id) \
             VALUES ($1, $2) ON CONFLICT (user_id, achievement_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // -- Aggregate counts the checks evaluate ------------------------------

    pub async fn enrollment_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE student_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Number of distinct course categories across the user's enrollments
    pub async fn distinct_category_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT c.category) FROM enrollments e \
             JOIN courses c ON c.id = e.course_id WHERE e.student_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Largest number of the user's enrollments within any single category
    pub async fn max_enrollments_in_one_category(
        &self,
        user_id: i32,
    ) -> Result<i64, AchievementError> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(cnt) FROM ( \
                 SELECT COUNT(*) AS cnt FROM enrollments e \
                 JOIN courses c ON c.id = e.course_id \
                 WHERE e.student_id = $1 GROUP BY c.category \
             ) per_category",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Completed lessons across all of the user's enrollments
    pub async fn lesson_completion_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lesson_completions lc \
             JOIN enrollments e ON e.id = lc.enrollment_id WHERE e.student_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Distinct quizzes with at least one passing attempt
    pub async fn distinct_passed_quiz_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT qa.quiz_lesson_id) FROM quiz_attempts qa \
             JOIN enrollments e ON e.id = qa.enrollment_id \
             WHERE e.student_id = $1 AND qa.passed",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn review_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Submitted-or-graded assignment entries across all enrollments
    pub async fn assignment_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignment_submissions s \
             JOIN enrollments e ON e.id = s.enrollment_id WHERE e.student_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn completed_course_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn certificate_count(&self, user_id: i32) -> Result<i64, AchievementError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM certificates c \
             JOIN enrollments e ON e.id = c.enrollment_id WHERE e.student_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
