use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::achievements::models::AchievementResponse;
use crate::validation::validate_rating_range;

/// Domain model representing a course review in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new review
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateReviewRequest {
    pub course_id: i32,
    #[validate(custom = "validate_rating_range")]
    pub rating: i16,
    #[validate(length(max = 1000, message = "Comment must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

/// Request DTO for updating an existing review
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(custom = "validate_rating_range")]
    pub rating: Option<i16>,
    #[validate(length(max = 1000, message = "Comment must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

/// Response DTO for API responses
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<AchievementResponse>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            user_id: review.user_id,
            course_id: review.course_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            updated_at: review.updated_at,
            new_achievements: Vec::new(),
        }
    }
}
