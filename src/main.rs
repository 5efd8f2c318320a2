mod achievements;
mod activity;
mod auth;
mod courses;
mod db;
mod enrollments;
mod error;
mod query;
mod reviews;
mod validation;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use achievements::{AchievementEngine, AchievementRepository};
use activity::ActivityLog;
use auth::repository::{TokenRepository, UserRepository};
use auth::AuthService;
use courses::{CourseRepository, StatsCalculator, StructureEditor};
use courses::models::{Course, CreateCourseRequest, UpdateCourseRequest};
use enrollments::{EnrollmentRepository, EnrollmentService, ProgressTracker};
use reviews::{ReviewRepository, ReviewService};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        courses::handlers::create_course,
        courses::handlers::get_course,
        courses::handlers::update_course,
        courses::handlers::delete_course,
    ),
    components(
        schemas(Course, CreateCourseRequest, UpdateCourseRequest)
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "courses", description = "Course catalog management endpoints")
    ),
    info(
        title = "LearnHub API",
        version = "1.0.0",
        description = "RESTful API for the LearnHub e-learning platform",
        contact(
            name = "API Support",
            email = "support@learnhub.dev"
        )
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth_service: AuthService,
    pub course_repo: CourseRepository,
    pub stats: StatsCalculator,
    pub editor: StructureEditor,
    pub enrollment_service: EnrollmentService,
    pub review_service: ReviewService,
    pub achievement_repo: AchievementRepository,
    pub activity_log: ActivityLog,
}

impl AppState {
    fn new(db: PgPool, jwt_secret: String) -> Self {
        let achievement_repo = AchievementRepository::new(db.clone());
        let achievement_engine = AchievementEngine::new(achievement_repo.clone());
        let activity_log = ActivityLog::new(db.clone());
        let stats = StatsCalculator::new(db.clone());

        let auth_service = AuthService::new(
            UserRepository::new(db.clone()),
            TokenRepository::new(db.clone()),
            jwt_secret,
            achievement_engine.clone(),
        );

        let enrollment_service = EnrollmentService::new(
            db.clone(),
            EnrollmentRepository::new(db.clone()),
            ProgressTracker::new(db.clone()),
            stats.clone(),
            achievement_engine.clone(),
            activity_log.clone(),
        );

        let review_service = ReviewService::new(
            ReviewRepository::new(db.clone()),
            stats.clone(),
            achievement_engine,
            activity_log.clone(),
        );

        Self {
            auth_service,
            course_repo: CourseRepository::new(db.clone()),
            stats,
            editor: StructureEditor::new(db.clone()),
            enrollment_service,
            review_service,
            achievement_repo,
            activity_log,
            db,
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool, jwt_secret: String) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let state = AppState::new(db, jwt_secret);

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Auth
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/me", get(auth::me_handler))
        // Course catalog
        .route("/api/courses", post(courses::handlers::create_course))
        .route("/api/courses", get(courses::handlers::list_courses))
        .route("/api/courses/:id", get(courses::handlers::get_course))
        .route("/api/courses/:id", put(courses::handlers::update_course))
        .route("/api/courses/:id", delete(courses::handlers::delete_course))
        .route(
            "/api/courses/:id/structure",
            put(courses::handlers::update_structure),
        )
        .route(
            "/api/courses/:id/stats",
            post(courses::handlers::recompute_stats).layer(axum::middleware::from_fn(
                |request, next| auth::RequireRole::admin().middleware(request, next),
            )),
        )
        // Enrollments and progress
        .route("/api/courses/:id/enroll", post(enrollments::handlers::enroll))
        .route(
            "/api/enrollments",
            get(enrollments::handlers::list_my_enrollments),
        )
        .route(
            "/api/enrollments/:id",
            get(enrollments::handlers::get_enrollment),
        )
        .route(
            "/api/enrollments/:id/lessons/:lesson_id/complete",
            post(enrollments::handlers::complete_lesson),
        )
        .route(
            "/api/enrollments/:id/lessons/:lesson_id/quiz",
            post(enrollments::handlers::attempt_quiz),
        )
        .route(
            "/api/enrollments/:id/lessons/:lesson_id/submission",
            post(enrollments::handlers::submit_assignment),
        )
        .route(
            "/api/submissions/:id/grade",
            put(enrollments::handlers::grade_submission),
        )
        .route(
            "/api/enrollments/:id/certificate",
            post(enrollments::handlers::issue_certificate),
        )
        // Reviews
        .route("/api/reviews", post(reviews::create_review_handler))
        .route("/api/reviews/:id", put(reviews::update_review_handler))
        .route("/api/reviews/:id", delete(reviews::delete_review_handler))
        .route(
            "/api/courses/:id/reviews",
            get(reviews::get_reviews_for_course_handler),
        )
        // Achievements and activity
        .route(
            "/api/achievements",
            get(achievements::handlers::list_achievements_handler),
        )
        .route(
            "/api/achievements/earned",
            get(achievements::handlers::list_earned_handler),
        )
        .route("/api/activity", get(activity::handlers::activity_feed_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("LearnHub API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let app = create_router(db_pool, jwt_secret);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("LearnHub API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests;
