// Achievement catalog models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry: one row per unique code, seeded by migration
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Achievement {
    pub id: i32,
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i32,
}

/// Response DTO for a catalog entry
#[derive(Debug, Clone, Serialize)]
pub struct AchievementResponse {
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i32,
}

impl From<Achievement> for AchievementResponse {
    fn from(a: Achievement) -> Self {
        Self {
            code: a.code,
            title: a.title,
            description: a.description,
            icon: a.icon,
            points: a.points,
        }
    }
}

/// An achievement a user has earned, with when they earned it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EarnedAchievement {
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i32,
    pub earned_at: DateTime<Utc>,
}
