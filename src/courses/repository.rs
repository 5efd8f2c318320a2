use sqlx::PgPool;

use super::error::CourseError;
use super::models::{Course, CourseDetail, CourseModule, Lesson, ModuleDetail};

pub const COURSE_COLUMNS: &str = "id, instructor_id, title, slug, description, category, price, \
     is_published, enrollment_count, total_lessons, total_duration, \
     rating_average, rating_count, created_at, updated_at";

const LESSON_COLUMNS: &str =
    "id, course_id, module_id, title, lesson_type, content, duration_minutes, sort_order, is_preview";

#[derive(Clone)]
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, course_id: i32) -> Result<Course, CourseError> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CourseError::CourseNotFound)
    }

    /// Loads a course together with its ordered module/lesson tree.
    pub async fn find_detail(&self, course_id: i32) -> Result<CourseDetail, CourseError> {
        let course = self.find_by_id(course_id).await?;

        let modules = sqlx::query_as::<_, CourseModule>(
            "SELECT id, course_id, title, description, sort_order
             FROM course_modules WHERE course_id = $1 ORDER BY sort_order",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let lessons = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = $1 ORDER BY sort_order"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let modules = modules
            .into_iter()
            .map(|module| {
                let lessons = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .cloned()
                    .collect();
                ModuleDetail { module, lessons }
            })
            .collect();

        Ok(CourseDetail { course, modules })
    }
}
