use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{Enrollment, EnrollmentStatus};

/// Re-derives an enrollment's progress from its completion records.
///
/// `percentage_complete`, `status` and `completed_at` are caches over the
/// `lesson_completions` table; this is the only code that writes them.
#[derive(Clone)]
pub struct ProgressTracker {
    pool: PgPool,
}

/// Completed-lesson share as a whole percentage. A course with no lessons
/// counts as 0% complete, never 100%. Partial completion caps at 99 so the
/// stored percentage reads 100 exactly when the enrollment is complete and
/// `status` flips — rounding alone would report 100 at e.g. 199 of 200.
pub fn percentage(completed: i64, total: i64) -> i32 {
    if total == 0 {
        return 0;
    }
    if completed >= total {
        return 100;
    }
    let pct = ((completed as f64 / total as f64) * 100.0).round() as i32;
    pct.min(99)
}

impl ProgressTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recomputes percentage and status for one enrollment and returns the
    /// refreshed row. Crossing 100% flips the enrollment to completed and
    /// stamps `completed_at`; dropping back below 100% (after a structure
    /// edit added lessons) reverts it to active and clears the stamp.
    pub async fn update_progress(&self, enrollment_id: i32) -> Result<Enrollment, sqlx::Error> {
        let (completed, total): (i64, i64) = sqlx::query_as(
            "SELECT
                 (SELECT COUNT(*) FROM lesson_completions lc
                   JOIN lessons l ON l.id = lc.lesson_id
                  WHERE lc.enrollment_id = e.id AND l.course_id = e.course_id),
                 (SELECT COUNT(*) FROM lessons l WHERE l.course_id = e.course_id)
             FROM enrollments e WHERE e.id = $1",
        )
        .bind(enrollment_id)
        .fetch_one(&self.pool)
        .await?;

        let pct = percentage(completed, total);
        let now_complete = total > 0 && completed >= total;

        let status = if now_complete {
            EnrollmentStatus::Completed
        } else {
            EnrollmentStatus::Active
        };
        let completed_at: Option<DateTime<Utc>> = if now_complete { Some(Utc::now()) } else { None };

        // completed_at is preserved if the enrollment was already completed,
        // so re-syncing does not rewrite history
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "UPDATE enrollments
             SET percentage_complete = $1,
                 status = CASE WHEN status = 'dropped' THEN status ELSE $2 END,
                 completed_at = CASE
                     WHEN $3 THEN COALESCE(completed_at, $4)
                     ELSE NULL
                 END
             WHERE id = $5
             RETURNING id, student_id, course_id, status, percentage_complete,
                       completed_at, enrolled_at",
        )
        .bind(pct)
        .bind(status)
        .bind(now_complete)
        .bind(completed_at)
        .bind(enrollment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(enrollment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_course_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn half_done_rounds_to_fifty() {
        assert_eq!(percentage(1, 2), 50);
    }

    #[test]
    fn one_of_three_rounds_to_thirty_three() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn all_lessons_done_is_one_hundred() {
        assert_eq!(percentage(7, 7), 100);
    }

    #[test]
    fn near_complete_caps_at_ninety_nine() {
        // round-half-up would say 100 here, but status has not flipped yet
        assert_eq!(percentage(199, 200), 99);
        assert_eq!(percentage(999, 1000), 99);
    }

    proptest! {
        #[test]
        fn percentage_stays_in_bounds(total in 0i64..10_000, completed in 0i64..10_000) {
            let completed = completed.min(total);
            let pct = percentage(completed, total);
            prop_assert!((0..=100).contains(&pct));
        }

        #[test]
        fn one_hundred_means_complete(total in 1i64..10_000, completed in 0i64..10_000) {
            let completed = completed.min(total);
            let pct = percentage(completed, total);
            prop_assert_eq!(pct == 100, completed == total);
        }
    }
}
