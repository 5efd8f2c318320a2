// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates that a course category is one of the accepted values
pub fn validate_category(category: &str) -> Result<(), ValidationError> {
    let valid = [
        "programming",
        "design",
        "business",
        "marketing",
        "music",
        "language",
        "science",
        "other",
    ];
    if valid.contains(&category.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_category"))
    }
}

/// Validates a course slug: lowercase alphanumerics and hyphens, no
/// leading/trailing hyphen
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    static SLUG_RE: OnceLock<Regex> = OnceLock::new();
    let re = SLUG_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug regex is valid")
    });
    if re.is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug"))
    }
}

/// Validates that a review rating is between 1 and 5
pub fn validate_rating_range(rating: i16) -> Result<(), ValidationError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::new("rating_out_of_range"))
    }
}

/// Validates that a lesson duration is non-negative (minutes)
pub fn validate_duration(duration: i32) -> Result<(), ValidationError> {
    if duration >= 0 {
        Ok(())
    } else {
        Err(ValidationError::new("duration_must_be_non_negative"))
    }
}

/// Validates that a quiz percentage is within 0..=100
pub fn validate_percentage(percentage: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&percentage) {
        Ok(())
    } else {
        Err(ValidationError::new("percentage_out_of_range"))
    }
}
