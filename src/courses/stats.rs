use sqlx::PgPool;

/// Recomputes the derived statistic columns cached on `courses` rows.
///
/// Every method recomputes its figures from the source-of-truth tables and
/// writes the result back, so a call is always safe to repeat. Callers that
/// treat recomputation as best-effort log the error and move on; callers
/// inside a write path propagate it.
#[derive(Clone)]
pub struct StatsCalculator {
    pool: PgPool,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CourseStats {
    pub enrollment_count: i32,
    pub total_lessons: i32,
    pub total_duration: i32,
    pub rating_average: f64,
    pub rating_count: i32,
}

/// Rounds a raw average rating to one decimal place, half away from zero.
pub fn round_average(raw: f64) -> f64 {
    (raw * 10.0).round() / 10.0
}

impl StatsCalculator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recomputes `rating_average` and `rating_count` from the reviews table.
    /// A course with no reviews averages 0.0.
    pub async fn recalc_rating(&self, course_id: i32) -> Result<(f64, i32), sqlx::Error> {
        let (avg, count): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        let average = round_average(avg.unwrap_or(0.0));

        sqlx::query(
            "UPDATE courses SET rating_average = $1, rating_count = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(average)
        .bind(count as i32)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        Ok((average, count as i32))
    }

    /// Recomputes `total_lessons` and `total_duration` from the lessons table.
    pub async fn recalc_lesson_totals(&self, course_id: i32) -> Result<(i32, i32), sqlx::Error> {
        let (count, duration): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
             FROM lessons WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            "UPDATE courses SET total_lessons = $1, total_duration = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(count as i32)
        .bind(duration as i32)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        Ok((count as i32, duration as i32))
    }

    /// Recomputes `enrollment_count`, counting every non-dropped enrollment.
    pub async fn recalc_enrollment_count(&self, course_id: i32) -> Result<i32, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status <> 'dropped'",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE courses SET enrollment_count = $1, updated_at = NOW() WHERE id = $2")
            .bind(count as i32)
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(count as i32)
    }

    /// Full recompute of every derived column for a course. Used by the
    /// admin recompute endpoint to repair drifted caches.
    pub async fn update_stats(&self, course_id: i32) -> Result<CourseStats, sqlx::Error> {
        let (total_lessons, total_duration) = self.recalc_lesson_totals(course_id).await?;
        let enrollment_count = self.recalc_enrollment_count(course_id).await?;
        let (rating_average, rating_count) = self.recalc_rating(course_id).await?;

        Ok(CourseStats {
            enrollment_count,
            total_lessons,
            total_duration,
            rating_average,
            rating_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_average(4.666666), 4.7);
        assert_eq!(round_average(4.64), 4.6);
        assert_eq!(round_average(0.0), 0.0);
        assert_eq!(round_average(5.0), 5.0);
    }

    #[test]
    fn two_fives_and_a_four_round_to_four_point_seven() {
        let raw = (5.0 + 5.0 + 4.0) / 3.0;
        assert_eq!(round_average(raw), 4.7);
    }

    proptest! {
        #[test]
        fn rounded_average_stays_close_to_raw(raw in 1.0f64..=5.0) {
            let rounded = round_average(raw);
            prop_assert!((rounded - raw).abs() <= 0.05 + f64::EPSILON);
            // one decimal place exactly
            prop_assert_eq!(round_average(rounded), rounded);
        }
    }
}
