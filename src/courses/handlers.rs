use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::auth::models::Role;
use crate::db;
use crate::error::ApiError;
use crate::query::{CatalogQueryBuilder, CatalogQueryParams, QueryValidator};
use crate::AppState;

use super::error::CourseError;
use super::models::{
    Course, CourseDetail, CourseStructureRequest, CreateCourseRequest, UpdateCourseRequest,
};
use super::repository::COURSE_COLUMNS;
use super::stats::CourseStats;

/// Handler for POST /api/courses
/// Creates a new course owned by the authenticated instructor
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created successfully", body = Course),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Invalid slug"})),
        (status = 403, description = "Caller is not an instructor", body = String),
        (status = 409, description = "Slug already in use", body = String, example = json!({"error": "Course with slug 'rust-basics' already exists"}))
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    tracing::debug!("Creating new course: {}", payload.title);

    if user.role == Role::Student {
        return Err(ApiError::Forbidden(
            "Only instructors can create courses".to_string(),
        ));
    }

    payload.validate()?;

    if db::check_duplicate_slug(&state.db, &payload.slug).await? {
        tracing::warn!("Attempt to create duplicate course slug: {}", payload.slug);
        return Err(ApiError::Conflict {
            message: format!("Course with slug '{}' already exists", payload.slug),
        });
    }

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (instructor_id, title, slug, description, category, price, is_published)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COURSE_COLUMNS}
        "#,
    ))
    .bind(user.user_id)
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(&payload.description)
    .bind(&payload.category)
    .bind(payload.price)
    .bind(payload.is_published)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully created course with id: {}", course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

/// Handler for GET /api/courses
/// Published-course catalog with search, filtering, sorting, and pagination
pub async fn list_courses(
    Query(params): Query<CatalogQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, ApiError> {
    tracing::debug!("Fetching catalog with query parameters: {:?}", params);

    let validated = QueryValidator::validate(params).map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        let mut error = validator::ValidationError::new("invalid_query");
        error.message = Some(e.message.into());
        errors.add("query", error);
        ApiError::ValidationError(errors)
    })?;

    let mut builder = CatalogQueryBuilder::new();

    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    if let Some(category) = validated.category {
        builder.add_category_filter(&category);
    }
    builder.add_price_range(validated.min_price, validated.max_price);

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }

    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    let mut query = sqlx::query_as::<_, Course>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let courses = query.fetch_all(&state.db).await?;

    tracing::debug!("Catalog query returned {} courses", courses.len());
    Ok(Json(courses))
}

/// Handler for GET /api/courses/:id
/// Retrieves a course with its full module/lesson tree
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(
        ("id" = i32, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course found", body = Course),
        (status = 404, description = "Course not found", body = String, example = json!({"error": "Course with id 1 not found"}))
    ),
    tag = "courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CourseDetail>, ApiError> {
    tracing::debug!("Fetching course with id: {}", id);

    let detail = state.course_repo.find_detail(id).await.map_err(|e| match e {
        CourseError::CourseNotFound => ApiError::NotFound {
            resource: "Course".to_string(),
            id: id.to_string(),
        },
        CourseError::DatabaseError(db) => ApiError::DatabaseError(db),
        other => ApiError::InternalError(other.to_string()),
    })?;

    Ok(Json(detail))
}

/// Handler for PUT /api/courses/:id
/// Updates course metadata; owner or admin only
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(
        ("id" = i32, Path, description = "Course ID")
    ),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated successfully", body = Course),
        (status = 403, description = "Caller does not own this course", body = String),
        (status = 404, description = "Course not found", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
pub async fn update_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    tracing::debug!("Updating course with id: {}", id);

    payload.validate()?;

    let existing = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound {
        resource: "Course".to_string(),
        id: id.to_string(),
    })?;

    if !user.can_manage_course(existing.instructor_id) {
        return Err(ApiError::Forbidden(
            "Only the course instructor or an admin can modify this course".to_string(),
        ));
    }

    if let Some(ref new_slug) = payload.slug {
        if db::check_duplicate_slug_excluding_id(&state.db, new_slug, id).await? {
            return Err(ApiError::Conflict {
                message: format!("Course with slug '{}' already exists", new_slug),
            });
        }
    }

    let updated = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses
        SET title = $1, slug = $2, description = $3, category = $4,
            price = $5, is_published = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING {COURSE_COLUMNS}
        "#,
    ))
    .bind(payload.title.unwrap_or(existing.title))
    .bind(payload.slug.unwrap_or(existing.slug))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.category.unwrap_or(existing.category))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.is_published.unwrap_or(existing.is_published))
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully updated course with id: {}", id);
    Ok(Json(updated))
}

/// Handler for DELETE /api/courses/:id
/// Removes a course and everything hanging off it; owner or admin only
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(
        ("id" = i32, Path, description = "Course ID")
    ),
    responses(
        (status = 204, description = "Course deleted successfully"),
        (status = 403, description = "Caller does not own this course", body = String),
        (status = 404, description = "Course not found", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "courses"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting course with id: {}", id);

    let instructor_id: i32 = sqlx::query_scalar("SELECT instructor_id FROM courses WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Course".to_string(),
            id: id.to_string(),
        })?;

    if !user.can_manage_course(instructor_id) {
        return Err(ApiError::Forbidden(
            "Only the course instructor or an admin can delete this course".to_string(),
        ));
    }

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    tracing::info!("Successfully deleted course with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PUT /api/courses/:id/structure
/// Replaces the module/lesson tree in a single transaction
pub async fn update_structure(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<CourseStructureRequest>,
) -> Result<Json<CourseDetail>, CourseError> {
    tracing::debug!("Applying structure edit to course {}", id);

    let outcome = state.editor.apply_structure(id, &user, &payload).await?;
    tracing::info!(
        course_id = id,
        total_lessons = outcome.total_lessons,
        deleted = outcome.deleted_lessons.len(),
        "structure edit applied"
    );

    let detail = state.course_repo.find_detail(id).await?;
    Ok(Json(detail))
}

/// Handler for POST /api/courses/:id/stats
/// Recomputes all derived statistics for a course. The route is gated by
/// the admin role middleware.
pub async fn recompute_stats(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CourseStats>, CourseError> {
    // 404 before recompute so a bad id is reported as such
    state.course_repo.find_by_id(id).await?;

    let stats = state.stats.update_stats(id).await?;
    tracing::info!(course_id = id, "derived statistics recomputed");
    Ok(Json(stats))
}
