use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::achievements::models::AchievementResponse;
use crate::validation::validate_percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i32,
    pub student_id: i32,
    pub course_id: i32,
    pub status: EnrollmentStatus,
    pub percentage_complete: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAttempt {
    pub id: i32,
    pub enrollment_id: i32,
    pub quiz_lesson_id: Uuid,
    pub percentage: f64,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentSubmission {
    pub id: i32,
    pub enrollment_id: i32,
    pub assignment_lesson_id: Uuid,
    pub status: String,
    pub grade: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i32,
    pub enrollment_id: i32,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteLessonRequest {
    #[validate(range(min = 0, message = "time_spent_seconds must be non-negative"))]
    #[serde(default)]
    pub time_spent_seconds: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuizAttemptRequest {
    #[validate(custom = "validate_percentage")]
    pub percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct GradeAssignmentRequest {
    pub grade: f64,
}

/// Enrollment state plus whatever badges the action just unlocked.
/// `new_achievements` is omitted from the JSON body when empty.
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<AchievementResponse>,
}

#[derive(Debug, Serialize)]
pub struct QuizAttemptResponse {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<AchievementResponse>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub submission: AssignmentSubmission,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<AchievementResponse>,
}

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    #[serde(flatten)]
    pub certificate: Certificate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<AchievementResponse>,
}
