//! Course catalog entities and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use supernova_core::{PaginationMeta, PaginationParams};

use crate::content::{ContentTree, CourseVersion};
use crate::enums::{CourseStatus, DifficultyLevel};
use crate::validators::{validate_course_code, validate_currency, validate_pricing_type};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub status: CourseStatus,
    pub difficulty_level: DifficultyLevel,
    pub tags: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub target_audience: Vec<String>,
    /// Course ids that should be completed first
    pub prerequisites: Vec<Uuid>,
    /// Estimated effort in hours
    pub estimated_duration: Option<i32>,
    pub grade_level: Option<String>,
    pub academic_year: Option<String>,
    pub sequence_number: i32,
    pub cover_image_url: Option<String>,
    pub settings: Option<Value>,
    pub is_b2b_enabled: bool,
    pub is_d2c_enabled: bool,
    pub base_price: Option<f64>,
    pub currency: Option<String>,
    pub pricing_type: Option<String>,
    pub created_by_id: Uuid,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Open to self-enrollment by individual users.
    pub fn is_publicly_available(&self) -> bool {
        self.is_d2c_enabled && self.status == CourseStatus::Published && !self.is_deleted
    }

    /// Fields that must be present before the course can be published,
    /// other than the current version which lives in another table.
    pub fn missing_publish_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self
            .description
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            missing.push("description");
        }
        if self.is_d2c_enabled {
            if self.base_price.is_none() {
                missing.push("base_price");
            }
            if self.currency.is_none() {
                missing.push("currency");
            }
        }
        missing
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_course_code"))]
    #[schema(example = "MATH-101")]
    pub code: String,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<Uuid>,
    #[validate(range(min = 1))]
    pub estimated_duration: Option<i32>,
    #[validate(length(max = 20))]
    pub grade_level: Option<String>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    #[validate(url)]
    pub cover_image_url: Option<String>,
    pub settings: Option<Value>,
    pub is_b2b_enabled: Option<bool>,
    pub is_d2c_enabled: Option<bool>,
    #[validate(range(exclusive_min = 0.0))]
    pub base_price: Option<f64>,
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,
    #[validate(custom(function = "validate_pricing_type"))]
    #[schema(example = "one-time")]
    pub pricing_type: Option<String>,
}

/// Partial update. A `status` change follows the course lifecycle and
/// publishing checks the required fields.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_course_code"))]
    pub code: Option<String>,
    pub status: Option<CourseStatus>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub tags: Option<Vec<String>>,
    pub learning_objectives: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub prerequisites: Option<Vec<Uuid>>,
    #[validate(range(min = 1))]
    pub estimated_duration: Option<i32>,
    #[validate(length(max = 20))]
    pub grade_level: Option<String>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    #[validate(url)]
    pub cover_image_url: Option<String>,
    pub settings: Option<Value>,
    pub is_b2b_enabled: Option<bool>,
    pub is_d2c_enabled: Option<bool>,
    #[validate(range(exclusive_min = 0.0))]
    pub base_price: Option<f64>,
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,
    #[validate(custom(function = "validate_pricing_type"))]
    pub pricing_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilterParams {
    pub status: Option<CourseStatus>,
    /// Matches title, description or code
    pub search: Option<String>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedCoursesResponse {
    pub data: Vec<Course>,
    pub meta: PaginationMeta,
}

/// A course with its current version and the full content tree.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub current_version: Option<CourseVersion>,
    pub content: Option<ContentTree>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            title: "Algebra".to_string(),
            description: Some("Linear equations".to_string()),
            code: "MATH-101".to_string(),
            status: CourseStatus::Draft,
            difficulty_level: DifficultyLevel::Beginner,
            tags: vec![],
            learning_objectives: vec![],
            target_audience: vec![],
            prerequisites: vec![],
            estimated_duration: None,
            grade_level: None,
            academic_year: None,
            sequence_number: 1,
            cover_image_url: None,
            settings: None,
            is_b2b_enabled: true,
            is_d2c_enabled: false,
            base_price: None,
            currency: None,
            pricing_type: None,
            created_by_id: Uuid::new_v4(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn b2b_course_with_description_is_publishable() {
        assert!(course().missing_publish_fields().is_empty());
    }

    #[test]
    fn blank_description_blocks_publishing() {
        let mut c = course();
        c.description = Some("   ".to_string());
        assert_eq!(c.missing_publish_fields(), vec!["description"]);
    }

    #[test]
    fn d2c_course_needs_price_and_currency() {
        let mut c = course();
        c.is_d2c_enabled = true;
        assert_eq!(c.missing_publish_fields(), vec!["base_price", "currency"]);

        c.base_price = Some(49.0);
        c.currency = Some("USD".to_string());
        assert!(c.missing_publish_fields().is_empty());
    }

    #[test]
    fn public_availability_requires_published_d2c() {
        let mut c = course();
        c.is_d2c_enabled = true;
        assert!(!c.is_publicly_available());
        c.status = CourseStatus::Published;
        assert!(c.is_publicly_available());
    }

    #[test]
    fn price_must_be_positive() {
        let dto: CreateCourseDto = serde_json::from_value(serde_json::json!({
            "title": "Physics",
            "code": "phy-1",
            "base_price": 0.0,
            "currency": "usd"
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("base_price"));
        assert!(fields.contains_key("currency"));
        assert!(!fields.contains_key("code"));
    }
}
