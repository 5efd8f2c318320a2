use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Course not found")]
    CourseNotFound,

    #[error("Enrollment not found")]
    EnrollmentNotFound,

    #[error("Already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Course is not published")]
    CourseNotPublished,

    #[error("Lesson does not belong to this course")]
    LessonNotInCourse,

    #[error("Lesson is not a {expected} lesson")]
    WrongLessonType { expected: &'static str },

    #[error("Enrollment does not belong to the authenticated user")]
    NotEnrollmentOwner,

    #[error("Course is not fully completed")]
    CourseNotCompleted,

    #[error("Certificate already issued for this enrollment")]
    CertificateAlreadyIssued,

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<validator::ValidationErrors> for EnrollmentError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EnrollmentError::ValidationError(errors.to_string())
    }
}

impl IntoResponse for EnrollmentError {
    fn into_response(self) -> Response {
        let status = match &self {
            EnrollmentError::CourseNotFound | EnrollmentError::EnrollmentNotFound => {
                StatusCode::NOT_FOUND
            }
            EnrollmentError::AlreadyEnrolled | EnrollmentError::CertificateAlreadyIssued => {
                StatusCode::CONFLICT
            }
            EnrollmentError::CourseNotPublished
            | EnrollmentError::LessonNotInCourse
            | EnrollmentError::WrongLessonType { .. }
            | EnrollmentError::CourseNotCompleted
            | EnrollmentError::ValidationError(_) => StatusCode::BAD_REQUEST,
            EnrollmentError::NotEnrollmentOwner => StatusCode::FORBIDDEN,
            EnrollmentError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            EnrollmentError::DatabaseError(e) => {
                tracing::error!("Database error in enrollment operation: {}", e);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
