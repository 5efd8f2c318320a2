use sqlx::PgPool;
use uuid::Uuid;

use super::error::EnrollmentError;
use super::models::{AssignmentSubmission, Certificate, Enrollment, QuizAttempt};

const ENROLLMENT_COLUMNS: &str =
    "id, student_id, course_id, status, percentage_complete, completed_at, enrolled_at";

#[derive(Clone)]
pub struct EnrollmentRepository {
    pool: PgPool,
}

impl EnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<Enrollment, EnrollmentError> {
        let result = sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO enrollments (student_id, course_id)
             VALUES ($1, $2)
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(enrollment) => Ok(enrollment),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(EnrollmentError::AlreadyEnrolled)
            }
            Err(e) => Err(EnrollmentError::DatabaseError(e)),
        }
    }

    pub async fn find_by_id(&self, enrollment_id: i32) -> Result<Enrollment, EnrollmentError> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EnrollmentError::EnrollmentNotFound)
    }

    pub async fn list_for_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        Ok(sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
             WHERE student_id = $1 ORDER BY enrolled_at DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Idempotent completion insert; returns false when the lesson was
    /// already marked complete for this enrollment.
    pub async fn mark_lesson_complete(
        &self,
        enrollment_id: i32,
        lesson_id: Uuid,
        time_spent_seconds: i32,
    ) -> Result<bool, EnrollmentError> {
        let result = sqlx::query(
            "INSERT INTO lesson_completions (enrollment_id, lesson_id, time_spent_seconds)
             VALUES ($1, $2, $3)
             ON CONFLICT (enrollment_id, lesson_id) DO NOTHING",
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .bind(time_spent_seconds)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn record_quiz_attempt(
        &self,
        enrollment_id: i32,
        quiz_lesson_id: Uuid,
        percentage: f64,
        passed: bool,
    ) -> Result<QuizAttempt, EnrollmentError> {
        Ok(sqlx::query_as::<_, QuizAttempt>(
            "INSERT INTO quiz_attempts (enrollment_id, quiz_lesson_id, percentage, passed)
             VALUES ($1, $2, $3, $4)
             RETURNING id, enrollment_id, quiz_lesson_id, percentage, passed, attempted_at",
        )
        .bind(enrollment_id)
        .bind(quiz_lesson_id)
        .bind(percentage)
        .bind(passed)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn create_submission(
        &self,
        enrollment_id: i32,
        assignment_lesson_id: Uuid,
    ) -> Result<AssignmentSubmission, EnrollmentError> {
        Ok(sqlx::query_as::<_, AssignmentSubmission>(
            "INSERT INTO assignment_submissions (enrollment_id, assignment_lesson_id)
             VALUES ($1, $2)
             RETURNING id, enrollment_id, assignment_lesson_id, status, grade, submitted_at",
        )
        .bind(enrollment_id)
        .bind(assignment_lesson_id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn grade_submission(
        &self,
        submission_id: i32,
        grade: f64,
    ) -> Result<AssignmentSubmission, EnrollmentError> {
        sqlx::query_as::<_, AssignmentSubmission>(
            "UPDATE assignment_submissions
             SET status = 'graded', grade = $1
             WHERE id = $2
             RETURNING id, enrollment_id, assignment_lesson_id, status, grade, submitted_at",
        )
        .bind(grade)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EnrollmentError::EnrollmentNotFound)
    }

    pub async fn create_certificate(
        &self,
        enrollment_id: i32,
        certificate_number: &str,
    ) -> Result<Certificate, EnrollmentError> {
        let result = sqlx::query_as::<_, Certificate>(
            "INSERT INTO certificates (enrollment_id, certificate_number)
             VALUES ($1, $2)
             RETURNING id, enrollment_id, certificate_number, issued_at",
        )
        .bind(enrollment_id)
        .bind(certificate_number)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(certificate) => Ok(certificate),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(EnrollmentError::CertificateAlreadyIssued)
            }
            Err(e) => Err(EnrollmentError::DatabaseError(e)),
        }
    }
}
