// HTTP handlers for review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::achievements::models::AchievementResponse;
use crate::auth::middleware::AuthenticatedUser;
use crate::reviews::{
    error::ErrorResponse,
    models::{CreateReviewRequest, ReviewResponse, UpdateReviewRequest},
    ServiceError,
};
use crate::AppState;

/// Create a new review
/// POST /api/reviews
pub async fn create_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ErrorResponse> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (review, granted) = state
        .review_service
        .create_review(user.user_id, request)
        .await?;

    let mut response = ReviewResponse::from(review);
    response.new_achievements = granted.into_iter().map(AchievementResponse::from).collect();

    Ok((StatusCode::CREATED, Json(response)))
}

/// Update an existing review
/// PUT /api/reviews/{id}
pub async fn update_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, ErrorResponse> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let review = state
        .review_service
        .update_review(review_id, user.user_id, request)
        .await?;

    Ok(Json(ReviewResponse::from(review)))
}

/// Delete a review
/// DELETE /api/reviews/{id}
pub async fn delete_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ErrorResponse> {
    state
        .review_service
        .delete_review(review_id, user.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get all reviews for a course
/// GET /api/courses/{id}/reviews
pub async fn get_reviews_for_course_handler(
    State(state): State<AppState>,
    Path(course_id): Path<i32>,
) -> Result<Json<Vec<ReviewResponse>>, ErrorResponse> {
    let reviews = state
        .review_service
        .get_reviews_for_course(course_id)
        .await?;

    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}
