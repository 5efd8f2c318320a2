use validator::Validate;

use crate::achievements::engine::{AchievementEngine, AchievementTrigger};
use crate::achievements::models::Achievement;
use crate::activity::models::ActivityType;
use crate::activity::repository::ActivityLog;
use crate::courses::stats::StatsCalculator;
use crate::reviews::{
    CreateReviewRequest, Review, ReviewRepository, ServiceError, UpdateReviewRequest,
};

/// Service layer for review business logic
#[derive(Clone)]
pub struct ReviewService {
    repository: ReviewRepository,
    stats: StatsCalculator,
    achievements: AchievementEngine,
    activity: ActivityLog,
}

impl ReviewService {
    pub fn new(
        repository: ReviewRepository,
        stats: StatsCalculator,
        achievements: AchievementEngine,
        activity: ActivityLog,
    ) -> Self {
        Self {
            repository,
            stats,
            achievements,
            activity,
        }
    }

    /// Create a new review
    ///
    /// This method:
    /// 1. Validates the request
    /// 2. Checks for duplicate reviews (user already reviewed this course)
    /// 3. Verifies the course exists and the user is enrolled
    /// 4. Creates the review
    /// 5. Recomputes the course's cached rating average
    pub async fn create_review(
        &self,
        user_id: i32,
        request: CreateReviewRequest,
    ) -> Result<(Review, Vec<Achievement>), ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))?;

        if self
            .repository
            .find_by_user_and_course(user_id, request.course_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateReview);
        }

        if !self.repository.course_exists(request.course_id).await? {
            return Err(ServiceError::CourseNotFound);
        }

        if !self.repository.is_enrolled(user_id, request.course_id).await? {
            return Err(ServiceError::NotEnrolled);
        }

        let review = self
            .repository
            .create(user_id, request.course_id, request.rating, request.comment)
            .await?;

        // The review row is the source of truth; a failed cache refresh must
        // not fail the write that already persisted
        if let Err(e) = self.stats.recalc_rating(request.course_id).await {
            tracing::warn!(course_id = request.course_id, "rating recompute failed: {}", e);
        }

        self.activity
            .record(
                user_id,
                ActivityType::ReviewPosted,
                Some(request.course_id),
                None,
                serde_json::json!({ "rating": request.rating }),
            )
            .await;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::Reviewed { user_id })
            .await;

        Ok((review, granted))
    }

    /// Update an existing review
    ///
    /// This method:
    /// 1. Validates the request
    /// 2. Fetches the existing review
    /// 3. Verifies the user owns the review
    /// 4. Updates the review
    /// 5. Recomputes the cached rating if the rating changed
    pub async fn update_review(
        &self,
        review_id: i32,
        user_id: i32,
        request: UpdateReviewRequest,
    ) -> Result<Review, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))?;

        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if existing.user_id != user_id {
            return Err(ServiceError::Unauthorized);
        }

        let updated = self
            .repository
            .update(review_id, request.rating, request.comment)
            .await?;

        if request.rating.is_some() && request.rating != Some(existing.rating) {
            if let Err(e) = self.stats.recalc_rating(existing.course_id).await {
                tracing::warn!(course_id = existing.course_id, "rating recompute failed: {}", e);
            }
        }

        Ok(updated)
    }

    /// Delete a review
    ///
    /// This method:
    /// 1. Fetches the existing review
    /// 2. Verifies the user owns the review
    /// 3. Deletes the review
    /// 4. Recomputes the cached rating
    pub async fn delete_review(&self, review_id: i32, user_id: i32) -> Result<(), ServiceError> {
        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if existing.user_id != user_id {
            return Err(ServiceError::Unauthorized);
        }

        let course_id = existing.course_id;

        self.repository.delete(review_id).await?;
        if let Err(e) = self.stats.recalc_rating(course_id).await {
            tracing::warn!(course_id, "rating recompute failed: {}", e);
        }

        Ok(())
    }

    /// Get all reviews for a course
    pub async fn get_reviews_for_course(
        &self,
        course_id: i32,
    ) -> Result<Vec<Review>, ServiceError> {
        if !self.repository.course_exists(course_id).await? {
            return Err(ServiceError::CourseNotFound);
        }
        self.repository.find_by_course(course_id).await
    }
}
