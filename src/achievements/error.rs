// Achievement error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors from the achievement repository and engine.
/// Inside `AchievementEngine::evaluate` these are caught and logged; they
/// only reach HTTP responses through the catalog listing endpoints.
#[derive(Debug, Error)]
pub enum AchievementError {
    /// A rule referenced a code the seeded catalog does not contain
    #[error("Achievement code not in catalog: {0}")]
    MissingCode(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AchievementError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AchievementError::MissingCode(code) => {
                tracing::error!("Achievement catalog is missing code {}", code);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AchievementError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
