// Achievement rule engine
//
// Each check examines one slice of a user's history (logins, enrollments,
// completions, quizzes, reviews, certificates) against fixed thresholds and
// grants newly-qualifying badges through an idempotent insert. A single
// trigger may grant several badges at once.
//
// All thresholds use >= together with the already-granted guard, so a batch
// operation that jumps past a threshold still grants it.

use crate::achievements::{
    error::AchievementError,
    models::Achievement,
    repository::AchievementRepository,
};

/// Login streak tiers, checked on every login
const LOGIN_STREAK_TIERS: [(i32, &str); 4] = [
    (3, "LOGIN_STREAK_3"),
    (7, "LOGIN_STREAK_7"),
    (14, "LOGIN_STREAK_14"),
    (30, "LOGIN_STREAK_30"),
];

/// Enrollment count tiers
const ENROLLMENT_TIERS: [(i64, &str); 3] = [
    (1, "FIRST_ENROLLMENT"),
    (5, "ENROLLMENTS_5"),
    (10, "ENROLLMENTS_10"),
];

/// Completed-lesson count tiers
const LESSON_TIERS: [(i64, &str); 3] = [(1, "FIRST_LESSON"), (10, "LESSONS_10"), (50, "LESSONS_50")];

/// Completed-course count tiers
const COMPLETION_TIERS: [(i64, &str); 2] = [(1, "FIRST_COMPLETION"), (3, "COMPLETIONS_3")];

/// Distinct categories needed for the Explorer badge
const EXPLORER_CATEGORIES: i64 = 3;

/// Enrollments within one category needed for the Specialist badge
const SPECIALIST_ENROLLMENTS: i64 = 3;

/// Distinct passed quizzes needed for Quiz Master
const QUIZ_MASTER_PASSES: i64 = 5;

/// The event that caused achievement evaluation. Carries the acting user
/// and any event-specific scalar a check needs.
#[derive(Debug, Clone, Copy)]
pub enum AchievementTrigger {
    Login { user_id: i32, streak: i32 },
    Enrolled { user_id: i32 },
    LessonCompleted { user_id: i32 },
    QuizAttempted { user_id: i32, percentage: f64 },
    Reviewed { user_id: i32 },
    AssignmentSubmitted { user_id: i32 },
    CourseCompleted { user_id: i32 },
    CertificateIssued { user_id: i32 },
}

/// Rule engine over the achievement repository
#[derive(Clone)]
pub struct AchievementEngine {
    repo: AchievementRepository,
}

impl AchievementEngine {
    pub fn new(repo: AchievementRepository) -> Self {
        Self { repo }
    }

    /// Evaluate every check relevant to the trigger and return the badges it
    /// newly granted.
    ///
    /// This never fails: a check that errors is logged and contributes zero
    /// grants, so the triggering request (login, quiz submission, ...)
    /// always proceeds.
    pub async fn evaluate(&self, trigger: AchievementTrigger) -> Vec<Achievement> {
        let result = match trigger {
            AchievementTrigger::Login { user_id, streak } => {
                self.check_login_streak(user_id, streak).await
            }
            AchievementTrigger::Enrolled { user_id } => self.check_enrollments(user_id).await,
            AchievementTrigger::LessonCompleted { user_id } => {
                self.check_lesson_completions(user_id).await
            }
            AchievementTrigger::QuizAttempted {
                user_id,
                percentage,
            } => self.check_quiz(user_id, percentage).await,
            AchievementTrigger::Reviewed { user_id } => self.check_reviews(user_id).await,
            AchievementTrigger::AssignmentSubmitted { user_id } => {
                self.check_assignments(user_id).await
            }
            AchievementTrigger::CourseCompleted { user_id } => {
                self.check_course_completions(user_id).await
            }
            AchievementTrigger::CertificateIssued { user_id } => {
                self.check_certificates(user_id).await
            }
        };

        match result {
            Ok(granted) => {
                for achievement in &granted {
                    tracing::info!(
                        "Granted achievement {} to user trigger {:?}",
                        achievement.code,
                        trigger
                    );
                }
                granted
            }
            Err(e) => {
                tracing::warn!("Achievement check failed for {:?}: {}", trigger, e);
                Vec::new()
            }
        }
    }

    /// Grant a single code idempotently. Returns the achievement only when
    /// the user did not already hold it.
    async fn grant_code(
        &self,
        user_id: i32,
        code: &str,
    ) -> Result<Option<Achievement>, AchievementError> {
        let achievement = self
            .repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AchievementError::MissingCode(code.to_string()))?;

        if self.repo.grant(user_id, achievement.id).await? {
            Ok(Some(achievement))
        } else {
            Ok(None)
        }
    }

    async fn grant_tiers<T: PartialOrd + Copy>(
        &self,
        user_id: i32,
        value: T,
        tiers: &[(T, &str)],
    ) -> Result<Vec<Achievement>, AchievementError> {
        let mut granted = Vec::new();
        for (threshold, code) in tiers {
            if value >= *threshold {
                if let Some(achievement) = self.grant_code(user_id, code).await? {
                    granted.push(achievement);
                }
            }
        }
        Ok(granted)
    }

    /// Streak tiers at 3/7/14/30 days
    pub async fn check_login_streak(
        &self,
        user_id: i32,
        streak: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        self.grant_tiers(user_id, streak, &LOGIN_STREAK_TIERS).await
    }

    /// Enrollment count tiers plus the two category-diversity badges
    pub async fn check_enrollments(
        &self,
        user_id: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let count = self.repo.enrollment_count(user_id).await?;
        let mut granted = self.grant_tiers(user_id, count, &ENROLLMENT_TIERS).await?;

        if self.repo.distinct_category_count(user_id).await? >= EXPLORER_CATEGORIES {
            if let Some(a) = self.grant_code(user_id, "EXPLORER").await? {
                granted.push(a);
            }
        }

        if self.repo.max_enrollments_in_one_category(user_id).await? >= SPECIALIST_ENROLLMENTS {
            if let Some(a) = self.grant_code(user_id, "SPECIALIST").await? {
                granted.push(a);
            }
        }

        Ok(granted)
    }

    /// Completed-lesson tiers at 1/10/50
    pub async fn check_lesson_completions(
        &self,
        user_id: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let count = self.repo.lesson_completion_count(user_id).await?;
        self.grant_tiers(user_id, count, &LESSON_TIERS).await
    }

    /// Perfect score on this attempt, plus the distinct-passed-quizzes tier
    pub async fn check_quiz(
        &self,
        user_id: i32,
        percentage: f64,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let mut granted = Vec::new();

        if percentage >= 100.0 {
            if let Some(a) = self.grant_code(user_id, "PERFECT_QUIZ").await? {
                granted.push(a);
            }
        }

        if self.repo.distinct_passed_quiz_count(user_id).await? >= QUIZ_MASTER_PASSES {
            if let Some(a) = self.grant_code(user_id, "QUIZ_MASTER").await? {
                granted.push(a);
            }
        }

        Ok(granted)
    }

    pub async fn check_reviews(&self, user_id: i32) -> Result<Vec<Achievement>, AchievementError> {
        let mut granted = Vec::new();
        if self.repo.review_count(user_id).await? >= 1 {
            if let Some(a) = self.grant_code(user_id, "FIRST_REVIEW").await? {
                granted.push(a);
            }
        }
        Ok(granted)
    }

    pub async fn check_assignments(
        &self,
        user_id: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let mut granted = Vec::new();
        if self.repo.assignment_count(user_id).await? >= 1 {
            if let Some(a) = self.grant_code(user_id, "FIRST_ASSIGNMENT").await? {
                granted.push(a);
            }
        }
        Ok(granted)
    }

    /// Completed-course tiers at 1/3
    pub async fn check_course_completions(
        &self,
        user_id: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let count = self.repo.completed_course_count(user_id).await?;
        self.grant_tiers(user_id, count, &COMPLETION_TIERS).await
    }

    pub async fn check_certificates(
        &self,
        user_id: i32,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let mut granted = Vec::new();
        if self.repo.certificate_count(user_id).await? >= 1 {
            if let Some(a) = self.grant_code(user_id, "FIRST_CERTIFICATE").await? {
                granted.push(a);
            }
        }
        Ok(granted)
    }
}
