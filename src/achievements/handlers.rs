// HTTP handlers for achievement endpoints

use axum::{extract::State, Json};

use crate::achievements::{
    error::AchievementError,
    models::{AchievementResponse, EarnedAchievement},
};
use crate::auth::middleware::AuthenticatedUser;
use crate::AppState;

/// List the full achievement catalog
/// GET /api/achievements
pub async fn list_achievements_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AchievementResponse>>, AchievementError> {
    let achievements = state.achievement_repo.list_all().await?;
    Ok(Json(achievements.into_iter().map(Into::into).collect()))
}

/// List the achievements the authenticated user has earned
/// GET /api/achievements/earned
pub async fn list_earned_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<EarnedAchievement>>, AchievementError> {
    let earned = state.achievement_repo.list_earned(user.user_id).await?;
    Ok(Json(earned))
}
