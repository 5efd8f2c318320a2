use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::AppState;

use super::error::EnrollmentError;
use super::models::{
    CertificateResponse, CompleteLessonRequest, Enrollment, EnrollmentResponse,
    GradeAssignmentRequest, QuizAttemptRequest, QuizAttemptResponse, SubmissionResponse,
};

/// Handler for POST /api/courses/:id/enroll
pub async fn enroll(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(course_id): Path<i32>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), EnrollmentError> {
    let response = state.enrollment_service.enroll(&user, course_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /api/enrollments
pub async fn list_my_enrollments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Enrollment>>, EnrollmentError> {
    let enrollments = state.enrollment_service.list_my_enrollments(&user).await?;
    Ok(Json(enrollments))
}

/// Handler for GET /api/enrollments/:id
pub async fn get_enrollment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(enrollment_id): Path<i32>,
) -> Result<Json<Enrollment>, EnrollmentError> {
    let enrollment = state
        .enrollment_service
        .get_enrollment(&user, enrollment_id)
        .await?;
    Ok(Json(enrollment))
}

/// Handler for POST /api/enrollments/:id/lessons/:lesson_id/complete
pub async fn complete_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((enrollment_id, lesson_id)): Path<(i32, Uuid)>,
    Json(payload): Json<CompleteLessonRequest>,
) -> Result<Json<EnrollmentResponse>, EnrollmentError> {
    let response = state
        .enrollment_service
        .complete_lesson(&user, enrollment_id, lesson_id, payload)
        .await?;
    Ok(Json(response))
}

/// Handler for POST /api/enrollments/:id/lessons/:lesson_id/quiz
pub async fn attempt_quiz(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((enrollment_id, lesson_id)): Path<(i32, Uuid)>,
    Json(payload): Json<QuizAttemptRequest>,
) -> Result<(StatusCode, Json<QuizAttemptResponse>), EnrollmentError> {
    let response = state
        .enrollment_service
        .record_quiz_attempt(&user, enrollment_id, lesson_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for POST /api/enrollments/:id/lessons/:lesson_id/submission
pub async fn submit_assignment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((enrollment_id, lesson_id)): Path<(i32, Uuid)>,
) -> Result<(StatusCode, Json<SubmissionResponse>), EnrollmentError> {
    let response = state
        .enrollment_service
        .submit_assignment(&user, enrollment_id, lesson_id)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for PUT /api/submissions/:id/grade
pub async fn grade_submission(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(submission_id): Path<i32>,
    Json(payload): Json<GradeAssignmentRequest>,
) -> Result<Json<SubmissionResponse>, EnrollmentError> {
    let response = state
        .enrollment_service
        .grade_submission(&user, submission_id, payload)
        .await?;
    Ok(Json(response))
}

/// Handler for POST /api/enrollments/:id/certificate
pub async fn issue_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(enrollment_id): Path<i32>,
) -> Result<(StatusCode, Json<CertificateResponse>), EnrollmentError> {
    let response = state
        .enrollment_service
        .issue_certificate(&user, enrollment_id)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
