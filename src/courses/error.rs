use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourseError {
    #[error("Course not found")]
    CourseNotFound,

    #[error("Invalid course structure: {0}")]
    InvalidStructure(String),

    #[error("Only the course instructor or an admin can modify this course")]
    NotCourseOwner,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for CourseError {
    fn into_response(self) -> Response {
        let status = match &self {
            CourseError::CourseNotFound => StatusCode::NOT_FOUND,
            CourseError::InvalidStructure(_) => StatusCode::BAD_REQUEST,
            CourseError::NotCourseOwner => StatusCode::FORBIDDEN,
            CourseError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            CourseError::DatabaseError(e) => {
                tracing::error!("Database error in course operation: {}", e);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
