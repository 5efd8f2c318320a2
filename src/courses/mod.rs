// Courses module
// Catalog CRUD, the embedded module/lesson structure, derived statistic
// recomputation, and the structure-edit transaction coordinator

pub mod editor;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod stats;

pub use editor::StructureEditor;
pub use error::CourseError;
pub use models::*;
pub use repository::CourseRepository;
pub use stats::StatsCalculator;
