// Enrollments module
// Enrollment lifecycle, lesson/quiz/assignment progress tracking, and
// certificate issuance

pub mod error;
pub mod handlers;
pub mod models;
pub mod progress;
pub mod repository;
pub mod service;

pub use error::EnrollmentError;
pub use models::*;
pub use progress::ProgressTracker;
pub use repository::EnrollmentRepository;
pub use service::EnrollmentService;
