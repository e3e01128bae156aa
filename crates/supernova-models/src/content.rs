//! The content hierarchy: version → content → module → lesson.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use supernova_core::serde::deserialize_optional_uuid;
use supernova_core::{PaginationMeta, PaginationParams};

use crate::enums::{ContentType, CourseStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseContent {
    pub id: Uuid,
    pub syllabus_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_weeks: Option<i32>,
    pub content_status: CourseStatus,
    pub last_reviewed_by_id: Option<Uuid>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub resources: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named snapshot of a course. The current version has no `valid_until`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseVersion {
    pub id: Uuid,
    pub course_id: Uuid,
    #[schema(example = "1.0")]
    pub version: String,
    pub content_id: Uuid,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub changelog: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseVersion {
    pub fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseModule {
    pub id: Uuid,
    pub content_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub sequence_number: i32,
    pub duration_weeks: Option<i32>,
    pub status: CourseStatus,
    pub completion_criteria: Option<Value>,
    pub is_mandatory: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub sequence_number: i32,
    pub content_type: ContentType,
    pub content: Value,
    pub duration_minutes: Option<i32>,
    pub is_mandatory: bool,
    pub completion_criteria: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentTree {
    #[serde(flatten)]
    pub content: CourseContent,
    pub modules: Vec<ModuleWithLessons>,
}

impl ContentTree {
    /// Groups lessons under their modules, keeping both in sequence order.
    pub fn assemble(
        content: CourseContent,
        modules: Vec<CourseModule>,
        lessons: Vec<Lesson>,
    ) -> Self {
        let mut modules: Vec<ModuleWithLessons> = modules
            .into_iter()
            .map(|module| ModuleWithLessons {
                module,
                lessons: Vec::new(),
            })
            .collect();
        modules.sort_by_key(|m| m.module.sequence_number);

        for lesson in lessons {
            if let Some(parent) = modules.iter_mut().find(|m| m.module.id == lesson.module_id) {
                parent.lessons.push(lesson);
            }
        }
        for module in &mut modules {
            module.lessons.sort_by_key(|l| l.sequence_number);
        }

        Self { content, modules }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseVersionDetail {
    #[serde(flatten)]
    pub version: CourseVersion,
    pub content: CourseContent,
}

fn validate_content_window(dto: &CreateContentDto) -> Result<(), ValidationError> {
    if dto.end_date < dto.start_date {
        return Err(ValidationError::new("date_range")
            .with_message(Cow::Borrowed("end_date must not be before start_date")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_content_window"))]
pub struct CreateContentDto {
    #[validate(url)]
    pub syllabus_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    pub resources: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateVersionDto {
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "1.0")]
    pub version: String,
    pub changelog: Option<Value>,
    #[validate(nested)]
    pub content: CreateContentDto,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateContentDto {
    #[validate(url)]
    pub syllabus_url: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    pub content_status: Option<CourseStatus>,
    pub resources: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateModuleDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    /// Defaults to one past the last module of the content
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    pub status: Option<CourseStatus>,
    pub completion_criteria: Option<Value>,
    pub is_mandatory: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateModuleDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    pub status: Option<CourseStatus>,
    pub completion_criteria: Option<Value>,
    pub is_mandatory: Option<bool>,
}

/// New module order for one content: every module id exactly once.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderModulesDto {
    pub content_id: Uuid,
    #[validate(length(min = 1))]
    pub module_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModuleFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub content_id: Option<Uuid>,
    /// Modules of the course's current version
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    pub status: Option<CourseStatus>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedModulesResponse {
    pub data: Vec<CourseModule>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLessonDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    pub content_type: ContentType,
    /// Type-specific payload (text body, file URL, video URL, ...)
    pub content: Option<Value>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    pub is_mandatory: Option<bool>,
    pub completion_criteria: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLessonDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub sequence_number: Option<i32>,
    pub content_type: Option<ContentType>,
    pub content: Option<Value>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    pub is_mandatory: Option<bool>,
    pub completion_criteria: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LessonFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub module_id: Option<Uuid>,
    pub content_type: Option<ContentType>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedLessonsResponse {
    pub data: Vec<Lesson>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn content() -> CourseContent {
        let now = Utc::now();
        CourseContent {
            id: Uuid::new_v4(),
            syllabus_url: None,
            start_date: now,
            end_date: now + Duration::weeks(12),
            duration_weeks: Some(12),
            content_status: CourseStatus::Draft,
            last_reviewed_by_id: None,
            last_reviewed_at: None,
            resources: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn module(content_id: Uuid, seq: i32) -> CourseModule {
        let now = Utc::now();
        CourseModule {
            id: Uuid::new_v4(),
            content_id,
            title: format!("Module {}", seq),
            description: None,
            sequence_number: seq,
            duration_weeks: None,
            status: CourseStatus::Draft,
            completion_criteria: None,
            is_mandatory: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn lesson(module_id: Uuid, seq: i32) -> Lesson {
        let now = Utc::now();
        Lesson {
            id: Uuid::new_v4(),
            module_id,
            title: format!("Lesson {}", seq),
            description: None,
            sequence_number: seq,
            content_type: ContentType::Text,
            content: serde_json::json!({}),
            duration_minutes: None,
            is_mandatory: true,
            completion_criteria: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tree_orders_modules_and_lessons() {
        let content = content();
        let second = module(content.id, 2);
        let first = module(content.id, 1);
        let lessons = vec![
            lesson(first.id, 2),
            lesson(second.id, 1),
            lesson(first.id, 1),
            lesson(Uuid::new_v4(), 1),
        ];

        let tree = ContentTree::assemble(content, vec![second, first], lessons);

        assert_eq!(tree.modules[0].module.sequence_number, 1);
        assert_eq!(tree.modules[0].lessons.len(), 2);
        assert_eq!(tree.modules[0].lessons[0].sequence_number, 1);
        assert_eq!(tree.modules[1].lessons.len(), 1);
    }

    #[test]
    fn content_window_must_not_be_inverted() {
        let now = Utc::now();
        let dto = CreateContentDto {
            syllabus_url: None,
            start_date: now,
            end_date: now - Duration::days(1),
            duration_weeks: None,
            resources: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn version_label_length_is_bounded() {
        let now = Utc::now();
        let dto = CreateVersionDto {
            version: "v".repeat(21),
            changelog: None,
            content: CreateContentDto {
                syllabus_url: None,
                start_date: now,
                end_date: now,
                duration_weeks: None,
                resources: None,
            },
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("version"));
    }
}
