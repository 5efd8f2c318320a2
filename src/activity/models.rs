// Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of action an activity entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Enrolled,
    LessonCompleted,
    QuizAttempted,
    AssignmentSubmitted,
    ReviewPosted,
    CourseCompleted,
    CertificateIssued,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Enrolled => "enrolled",
            ActivityType::LessonCompleted => "lesson_completed",
            ActivityType::QuizAttempted => "quiz_attempted",
            ActivityType::AssignmentSubmitted => "assignment_submitted",
            ActivityType::ReviewPosted => "review_posted",
            ActivityType::CourseCompleted => "course_completed",
            ActivityType::CertificateIssued => "certificate_issued",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only log entry. Entries are never mutated or deleted by
/// normal flows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub user_id: i32,
    pub activity_type: ActivityType,
    pub course_id: Option<i32>,
    pub lesson_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
