use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_category, validate_duration, validate_slug};

/// A published or draft course as stored in the catalog. The
/// `enrollment_count`, `total_lessons`, `total_duration`, `rating_average`
/// and `rating_count` columns are derived caches maintained by
/// [`crate::courses::StatsCalculator`] and the structure editor.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Course {
    pub id: i32,
    pub instructor_id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub is_published: bool,
    pub enrollment_count: i32,
    pub total_lessons: i32,
    pub total_duration: i32,
    pub rating_average: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseModule {
    pub id: Uuid,
    pub course_id: i32,
    pub title: String,
    pub description: String,
    pub sort_order: i32,
}

/// Discriminant stored alongside the lesson content payload. Kept in its
/// own column so catalog queries can filter without unpacking JSONB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Text,
    Quiz,
    Assignment,
    Live,
    Download,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

/// Type-specific lesson payload, persisted as JSONB. The serde tag doubles
/// as the lesson type, so a payload can never disagree with its column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LessonContent {
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    Text {
        body: String,
    },
    Quiz {
        questions: Vec<QuizQuestion>,
        pass_mark: f64,
    },
    Assignment {
        instructions: String,
        max_points: i32,
    },
    Live {
        scheduled_at: DateTime<Utc>,
        meeting_url: String,
    },
    Download {
        file_url: String,
        file_name: String,
    },
}

impl LessonContent {
    pub fn lesson_type(&self) -> LessonType {
        match self {
            LessonContent::Video { .. } => LessonType::Video,
            LessonContent::Text { .. } => LessonType::Text,
            LessonContent::Quiz { .. } => LessonType::Quiz,
            LessonContent::Assignment { .. } => LessonType::Assignment,
            LessonContent::Live { .. } => LessonType::Live,
            LessonContent::Download { .. } => LessonType::Download,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: i32,
    pub module_id: Uuid,
    pub title: String,
    pub lesson_type: LessonType,
    pub content: Json<LessonContent>,
    pub duration_minutes: i32,
    pub sort_order: i32,
    pub is_preview: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(custom = "validate_slug")]
    pub slug: String,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_category")]
    pub category: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom = "validate_category")]
    pub category: Option<String>,
    #[schema(value_type = f64)]
    pub price: Option<Decimal>,
    pub is_published: Option<bool>,
}

/// Full replacement payload for a course's module/lesson tree. Incoming
/// ids that match stored rows mean "update in place"; anything else is
/// treated as a new row, and stored lessons absent from the payload are
/// deleted with their completion records.
#[derive(Debug, Deserialize, Validate)]
pub struct CourseStructureRequest {
    #[validate]
    pub modules: Vec<ModuleInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ModuleInput {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Module title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i32,
    #[validate]
    #[serde(default)]
    pub lessons: Vec<LessonInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LessonInput {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Lesson title must be between 1 and 200 characters"))]
    pub title: String,
    pub order: i32,
    #[validate(custom = "validate_duration")]
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub is_preview: bool,
    pub content: LessonContent,
}

#[derive(Debug, Serialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_request_accepts_numeric_price() {
        let raw = serde_json::json!({
            "title": "Rust Fundamentals",
            "slug": "rust-fundamentals",
            "description": "A thorough introduction to the Rust programming language.",
            "category": "programming",
            "price": 49.99
        });
        let request: CreateCourseRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.price, dec!(49.99));
    }

    #[test]
    fn lesson_content_tag_matches_type() {
        let content = LessonContent::Text {
            body: "Welcome".into(),
        };
        assert_eq!(content.lesson_type(), LessonType::Text);

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "text");
    }

    #[test]
    fn quiz_content_round_trips_through_json() {
        let content = LessonContent::Quiz {
            questions: vec![QuizQuestion {
                prompt: "2 + 2?".into(),
                options: vec!["3".into(), "4".into()],
                correct_option: 1,
            }],
            pass_mark: 70.0,
        };
        let json = serde_json::to_string(&content).unwrap();
        let parsed: LessonContent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.lesson_type(), LessonType::Quiz);
    }

    #[test]
    fn lesson_input_without_type_tag_is_rejected() {
        let raw = serde_json::json!({
            "title": "Intro",
            "order": 1,
            "content": { "body": "missing tag" }
        });
        assert!(serde_json::from_value::<LessonInput>(raw).is_err());
    }
}
