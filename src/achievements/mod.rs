// Achievement module
// Static badge catalog plus the rule engine that evaluates a user's history
// against fixed thresholds and grants badges idempotently

pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

pub use engine::{AchievementEngine, AchievementTrigger};
pub use error::AchievementError;
pub use models::*;
pub use repository::AchievementRepository;
