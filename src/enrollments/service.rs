use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::achievements::engine::{AchievementEngine, AchievementTrigger};
use crate::achievements::models::AchievementResponse;
use crate::activity::models::ActivityType;
use crate::activity::repository::ActivityLog;
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::models::Role;
use crate::courses::models::{LessonContent, LessonType};
use crate::courses::stats::StatsCalculator;

use super::error::EnrollmentError;
use super::models::{
    CertificateResponse, CompleteLessonRequest, Enrollment, EnrollmentResponse, EnrollmentStatus,
    GradeAssignmentRequest, QuizAttemptRequest, QuizAttemptResponse, SubmissionResponse,
};
use super::progress::ProgressTracker;
use super::repository::EnrollmentRepository;

/// Quizzes whose content carries no explicit pass mark pass at this score.
const DEFAULT_PASS_MARK: f64 = 70.0;

#[derive(Clone)]
pub struct EnrollmentService {
    pool: PgPool,
    repo: EnrollmentRepository,
    progress: ProgressTracker,
    stats: StatsCalculator,
    achievements: AchievementEngine,
    activity: ActivityLog,
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    lesson_type: LessonType,
    content: sqlx::types::Json<LessonContent>,
}

impl EnrollmentService {
    pub fn new(
        pool: PgPool,
        repo: EnrollmentRepository,
        progress: ProgressTracker,
        stats: StatsCalculator,
        achievements: AchievementEngine,
        activity: ActivityLog,
    ) -> Self {
        Self {
            pool,
            repo,
            progress,
            stats,
            achievements,
            activity,
        }
    }

    pub async fn enroll(
        &self,
        user: &AuthenticatedUser,
        course_id: i32,
    ) -> Result<EnrollmentResponse, EnrollmentError> {
        let is_published: bool =
            sqlx::query_scalar("SELECT is_published FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(EnrollmentError::CourseNotFound)?;

        if !is_published {
            return Err(EnrollmentError::CourseNotPublished);
        }

        let enrollment = self.repo.create(user.user_id, course_id).await?;

        if let Err(e) = self.stats.recalc_enrollment_count(course_id).await {
            tracing::warn!(course_id, "enrollment count recompute failed: {}", e);
        }

        self.activity
            .record(
                user.user_id,
                ActivityType::Enrolled,
                Some(course_id),
                None,
                serde_json::json!({}),
            )
            .await;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::Enrolled {
                user_id: user.user_id,
            })
            .await;

        tracing::info!(
            user_id = user.user_id,
            course_id,
            "student enrolled in course"
        );

        Ok(EnrollmentResponse {
            enrollment,
            new_achievements: granted.into_iter().map(AchievementResponse::from).collect(),
        })
    }

    pub async fn list_my_enrollments(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        self.repo.list_for_student(user.user_id).await
    }

    pub async fn get_enrollment(
        &self,
        user: &AuthenticatedUser,
        enrollment_id: i32,
    ) -> Result<Enrollment, EnrollmentError> {
        let enrollment = self.repo.find_by_id(enrollment_id).await?;
        self.authorize_owner(user, &enrollment)?;
        Ok(enrollment)
    }

    /// Marks a lesson complete and refreshes the enrollment's derived
    /// progress. Completing the same lesson twice is a no-op, not an error.
    pub async fn complete_lesson(
        &self,
        user: &AuthenticatedUser,
        enrollment_id: i32,
        lesson_id: Uuid,
        request: CompleteLessonRequest,
    ) -> Result<EnrollmentResponse, EnrollmentError> {
        request.validate()?;

        let enrollment = self.repo.find_by_id(enrollment_id).await?;
        self.authorize_owner(user, &enrollment)?;
        self.lesson_in_course(lesson_id, enrollment.course_id).await?;

        let was_completed = enrollment.status == EnrollmentStatus::Completed;

        let newly_marked = self
            .repo
            .mark_lesson_complete(enrollment_id, lesson_id, request.time_spent_seconds)
            .await?;

        let enrollment = self.progress.update_progress(enrollment_id).await?;

        let mut granted = Vec::new();
        if newly_marked {
            self.activity
                .record(
                    user.user_id,
                    ActivityType::LessonCompleted,
                    Some(enrollment.course_id),
                    Some(lesson_id),
                    serde_json::json!({ "percentage_complete": enrollment.percentage_complete }),
                )
                .await;

            granted = self
                .achievements
                .evaluate(AchievementTrigger::LessonCompleted {
                    user_id: user.user_id,
                })
                .await;

            if !was_completed && enrollment.status == EnrollmentStatus::Completed {
                self.activity
                    .record(
                        user.user_id,
                        ActivityType::CourseCompleted,
                        Some(enrollment.course_id),
                        None,
                        serde_json::json!({}),
                    )
                    .await;

                granted.extend(
                    self.achievements
                        .evaluate(AchievementTrigger::CourseCompleted {
                            user_id: user.user_id,
                        })
                        .await,
                );
            }
        }

        Ok(EnrollmentResponse {
            enrollment,
            new_achievements: granted.into_iter().map(AchievementResponse::from).collect(),
        })
    }

    pub async fn record_quiz_attempt(
        &self,
        user: &AuthenticatedUser,
        enrollment_id: i32,
        lesson_id: Uuid,
        request: QuizAttemptRequest,
    ) -> Result<QuizAttemptResponse, EnrollmentError> {
        request.validate()?;

        let enrollment = self.repo.find_by_id(enrollment_id).await?;
        self.authorize_owner(user, &enrollment)?;

        let lesson = self.lesson_in_course(lesson_id, enrollment.course_id).await?;
        if lesson.lesson_type != LessonType::Quiz {
            return Err(EnrollmentError::WrongLessonType { expected: "quiz" });
        }

        let pass_mark = match &*lesson.content {
            LessonContent::Quiz { pass_mark, .. } => *pass_mark,
            _ => DEFAULT_PASS_MARK,
        };
        let passed = request.percentage >= pass_mark;

        let attempt = self
            .repo
            .record_quiz_attempt(enrollment_id, lesson_id, request.percentage, passed)
            .await?;

        self.activity
            .record(
                user.user_id,
                ActivityType::QuizAttempted,
                Some(enrollment.course_id),
                Some(lesson_id),
                serde_json::json!({ "percentage": request.percentage, "passed": passed }),
            )
            .await;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::QuizAttempted {
                user_id: user.user_id,
                percentage: request.percentage,
            })
            .await;

        Ok(QuizAttemptResponse {
            attempt,
            new_achievements: granted.into_iter().map(AchievementResponse::from).collect(),
        })
    }

    pub async fn submit_assignment(
        &self,
        user: &AuthenticatedUser,
        enrollment_id: i32,
        lesson_id: Uuid,
    ) -> Result<SubmissionResponse, EnrollmentError> {
        let enrollment = self.repo.find_by_id(enrollment_id).await?;
        self.authorize_owner(user, &enrollment)?;

        let lesson = self.lesson_in_course(lesson_id, enrollment.course_id).await?;
        if lesson.lesson_type != LessonType::Assignment {
            return Err(EnrollmentError::WrongLessonType {
                expected: "assignment",
            });
        }

        let submission = self.repo.create_submission(enrollment_id, lesson_id).await?;

        self.activity
            .record(
                user.user_id,
                ActivityType::AssignmentSubmitted,
                Some(enrollment.course_id),
                Some(lesson_id),
                serde_json::json!({}),
            )
            .await;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::AssignmentSubmitted {
                user_id: user.user_id,
            })
            .await;

        Ok(SubmissionResponse {
            submission,
            new_achievements: granted.into_iter().map(AchievementResponse::from).collect(),
        })
    }

    /// Course instructor (or an admin) grades a submission.
    pub async fn grade_submission(
        &self,
        user: &AuthenticatedUser,
        submission_id: i32,
        request: GradeAssignmentRequest,
    ) -> Result<SubmissionResponse, EnrollmentError> {
        let instructor_id: Option<i32> = sqlx::query_scalar(
            "SELECT c.instructor_id
             FROM assignment_submissions s
             JOIN enrollments e ON e.id = s.enrollment_id
             JOIN courses c ON c.id = e.course_id
             WHERE s.id = $1",
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        let instructor_id = instructor_id.ok_or(EnrollmentError::EnrollmentNotFound)?;
        if !user.can_manage_course(instructor_id) {
            return Err(EnrollmentError::NotEnrollmentOwner);
        }

        let submission = self.repo.grade_submission(submission_id, request.grade).await?;

        Ok(SubmissionResponse {
            submission,
            new_achievements: Vec::new(),
        })
    }

    /// Issues the certificate for a fully completed enrollment. At most one
    /// certificate exists per enrollment; a repeat request conflicts.
    pub async fn issue_certificate(
        &self,
        user: &AuthenticatedUser,
        enrollment_id: i32,
    ) -> Result<CertificateResponse, EnrollmentError> {
        let enrollment = self.repo.find_by_id(enrollment_id).await?;
        self.authorize_owner(user, &enrollment)?;

        if enrollment.status != EnrollmentStatus::Completed {
            return Err(EnrollmentError::CourseNotCompleted);
        }

        let certificate_number = format!("CERT-{:08X}", rand::random::<u32>());
        let certificate = self
            .repo
            .create_certificate(enrollment_id, &certificate_number)
            .await?;

        self.activity
            .record(
                user.user_id,
                ActivityType::CertificateIssued,
                Some(enrollment.course_id),
                None,
                serde_json::json!({ "certificate_number": certificate.certificate_number }),
            )
            .await;

        let granted = self
            .achievements
            .evaluate(AchievementTrigger::CertificateIssued {
                user_id: user.user_id,
            })
            .await;

        Ok(CertificateResponse {
            certificate,
            new_achievements: granted.into_iter().map(AchievementResponse::from).collect(),
        })
    }

    fn authorize_owner(
        &self,
        user: &AuthenticatedUser,
        enrollment: &Enrollment,
    ) -> Result<(), EnrollmentError> {
        if enrollment.student_id != user.user_id && user.role != Role::Admin {
            return Err(EnrollmentError::NotEnrollmentOwner);
        }
        Ok(())
    }

    async fn lesson_in_course(
        &self,
        lesson_id: Uuid,
        course_id: i32,
    ) -> Result<LessonRow, EnrollmentError> {
        sqlx::query_as::<_, LessonRow>(
            "SELECT lesson_type, content FROM lessons WHERE id = $1 AND course_id = $2",
        )
        .bind(lesson_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EnrollmentError::LessonNotInCourse)
    }
}
