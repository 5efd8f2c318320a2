// Activity log module
// Append-only record of user actions, read back as a feed

pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{Activity, ActivityType};
pub use repository::ActivityLog;
