// HTTP handler for the activity feed

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::activity::models::Activity;
use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

const DEFAULT_FEED_LIMIT: i64 = 20;
const MAX_FEED_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
}

/// Recent activity for the authenticated user, newest first
/// GET /api/activity
pub async fn activity_feed_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, MAX_FEED_LIMIT);

    let feed = state.activity_log.recent_for_user(user.user_id, limit).await?;
    Ok(Json(feed))
}
