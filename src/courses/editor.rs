use std::collections::HashSet;

use serde_json::to_value;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::enrollments::progress::ProgressTracker;

use super::error::CourseError;
use super::models::{Course, CourseStructureRequest};
use super::repository::COURSE_COLUMNS;

/// Applies a full structure-edit payload to a course in one transaction.
///
/// The payload is the complete desired module/lesson tree. Incoming ids that
/// match stored rows are updated in place (preserving completion records);
/// unknown or absent ids become fresh rows; stored lessons missing from the
/// payload are deleted together with their completion records. Lesson totals
/// are recomputed before commit so the cached columns never lag the tree.
///
/// Enrollment progress that the deletions invalidated is repaired after
/// commit by a spawned best-effort sync; `sync_enrollments` is idempotent
/// and can also be invoked directly to repair a course at any time.
#[derive(Clone)]
pub struct StructureEditor {
    pool: PgPool,
}

#[derive(Debug)]
pub struct StructureOutcome {
    pub total_lessons: i32,
    pub deleted_lessons: Vec<Uuid>,
}

impl StructureEditor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn apply_structure(
        &self,
        course_id: i32,
        actor: &AuthenticatedUser,
        request: &CourseStructureRequest,
    ) -> Result<StructureOutcome, CourseError> {
        request
            .validate()
            .map_err(|e| CourseError::InvalidStructure(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        // Lock the course row for the duration of the edit so concurrent
        // structure edits serialize instead of interleaving.
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 FOR UPDATE"
        ))
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CourseError::CourseNotFound)?;

        if !actor.can_manage_course(course.instructor_id) {
            return Err(CourseError::NotCourseOwner);
        }

        let stored_modules: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM course_modules WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();

        let stored_lessons: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM lessons WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();

        // The module tree is replaced wholesale; lessons keep their identity
        // when the payload carries a known id, so completions survive edits.
        sqlx::query("DELETE FROM course_modules WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        let mut seen_lessons: HashSet<Uuid> = HashSet::new();

        for module in &request.modules {
            let module_id = match module.id {
                Some(id) if stored_modules.contains(&id) => id,
                _ => Uuid::new_v4(),
            };

            sqlx::query(
                "INSERT INTO course_modules (id, course_id, title, description, sort_order)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(module_id)
            .bind(course_id)
            .bind(&module.title)
            .bind(&module.description)
            .bind(module.order)
            .execute(&mut *tx)
            .await?;

            for lesson in &module.lessons {
                let content = to_value(&lesson.content)
                    .map_err(|e| CourseError::InvalidStructure(e.to_string()))?;
                let lesson_type = lesson.content.lesson_type();

                match lesson.id {
                    Some(id) if stored_lessons.contains(&id) => {
                        seen_lessons.insert(id);
                        sqlx::query(
                            "UPDATE lessons
                             SET module_id = $1, title = $2, lesson_type = $3, content = $4,
                                 duration_minutes = $5, sort_order = $6, is_preview = $7
                             WHERE id = $8 AND course_id = $9",
                        )
                        .bind(module_id)
                        .bind(&lesson.title)
                        .bind(lesson_type)
                        .bind(&content)
                        .bind(lesson.duration)
                        .bind(lesson.order)
                        .bind(lesson.is_preview)
                        .bind(id)
                        .bind(course_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                    _ => {
                        sqlx::query(
                            "INSERT INTO lessons
                                 (id, course_id, module_id, title, lesson_type, content,
                                  duration_minutes, sort_order, is_preview)
                             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                        )
                        .bind(Uuid::new_v4())
                        .bind(course_id)
                        .bind(module_id)
                        .bind(&lesson.title)
                        .bind(lesson_type)
                        .bind(&content)
                        .bind(lesson.duration)
                        .bind(lesson.order)
                        .bind(lesson.is_preview)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        let deleted_lessons: Vec<Uuid> =
            stored_lessons.difference(&seen_lessons).copied().collect();

        if !deleted_lessons.is_empty() {
            // Completion records must go with their lessons, in the same
            // transaction, or progress percentages would count ghost lessons.
            sqlx::query(
                "DELETE FROM lesson_completions
                 WHERE lesson_id = ANY($1)
                   AND enrollment_id IN (SELECT id FROM enrollments WHERE course_id = $2)",
            )
            .bind(&deleted_lessons)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM lessons WHERE course_id = $1 AND id = ANY($2)")
                .bind(course_id)
                .bind(&deleted_lessons)
                .execute(&mut *tx)
                .await?;
        }

        let (total_lessons, total_duration): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
             FROM lessons WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE courses SET total_lessons = $1, total_duration = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(total_lessons as i32)
        .bind(total_duration as i32)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // Progress repair happens outside the transaction; a failure here
        // leaves stale percentages that the next sync corrects.
        let editor = self.clone();
        tokio::spawn(async move {
            if let Err(e) = editor.sync_enrollments(course_id).await {
                tracing::warn!(
                    course_id,
                    "enrollment sync after structure edit failed: {}",
                    e
                );
            }
        });

        Ok(StructureOutcome {
            total_lessons: total_lessons as i32,
            deleted_lessons,
        })
    }

    /// Re-derives progress for every enrollment in a course. Removes any
    /// completion rows that no longer match a stored lesson, then recomputes
    /// each enrollment's percentage and status. Safe to run repeatedly.
    pub async fn sync_enrollments(&self, course_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM lesson_completions lc
             USING enrollments e
             WHERE lc.enrollment_id = e.id
               AND e.course_id = $1
               AND lc.lesson_id NOT IN (SELECT id FROM lessons WHERE course_id = $1)",
        )
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        let enrollment_ids: Vec<i32> =
            sqlx::query_scalar("SELECT id FROM enrollments WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&self.pool)
                .await?;

        let tracker = ProgressTracker::new(self.pool.clone());
        for enrollment_id in enrollment_ids {
            tracker.update_progress(enrollment_id).await?;
        }

        Ok(())
    }
}
