//! Enrollments and per-content progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use supernova_core::serde::deserialize_optional_uuid;
use supernova_core::{PaginationMeta, PaginationParams};

use crate::enums::{EnrollmentStatus, EnrollmentType, ProgressContentType, ProgressStatus};

/// Upper bound on the seconds a single progress update may add.
pub const MAX_TIME_SPENT_PER_UPDATE: i64 = 24 * 60 * 60;

/// A learner's enrollment in one course version.
///
/// Exactly one of `student_id` (B2B) and `individual_user_id` (D2C) is set,
/// matching `enrollment_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub version_id: Uuid,
    pub student_id: Option<Uuid>,
    pub individual_user_id: Option<Uuid>,
    pub enrolled_by_id: Uuid,
    pub enrollment_type: EnrollmentType,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Aggregate progress, 0.0 to 1.0
    pub progress: f64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub completion_score: Option<f64>,
    pub certificate_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// The learner this enrollment belongs to, whichever model it uses.
    pub fn learner_id(&self) -> Option<Uuid> {
        self.student_id.or(self.individual_user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProgress {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub content_type: ProgressContentType,
    pub content_id: Uuid,
    pub status: ProgressStatus,
    pub progress: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_interaction: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
    pub progress_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// B2B enrollment by school staff.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentDto {
    pub course_id: Uuid,
    pub student_id: Uuid,
}

/// D2C self-enrollment.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollIndividualDto {
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEnrollmentStatusDto {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProgressDto {
    pub enrollment_id: Uuid,
    pub content_type: ProgressContentType,
    pub content_id: Uuid,
    #[validate(range(min = 0.0, max = 1.0, message = "Progress must be between 0.0 and 1.0"))]
    pub progress: f64,
    /// Added to the time already recorded for this content, at most one day
    #[validate(range(
        min = 0,
        max = MAX_TIME_SPENT_PER_UPDATE,
        message = "Time spent must be between 0 and 86400 seconds"
    ))]
    pub time_spent_seconds: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedEnrollmentsResponse {
    pub data: Vec<Enrollment>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentProgress {
    pub enrollment: Enrollment,
    pub progress: Vec<UserProgress>,
}

/// Result of recording progress: the upserted row and the recomputed
/// enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressUpdateResponse {
    pub progress: UserProgress,
    pub enrollment: Enrollment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_out_of_range_is_rejected() {
        for value in [-0.1, 1.01] {
            let dto = UpdateProgressDto {
                enrollment_id: Uuid::new_v4(),
                content_type: ProgressContentType::Lesson,
                content_id: Uuid::new_v4(),
                progress: value,
                time_spent_seconds: None,
                metadata: None,
            };
            let errors = dto.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("progress"));
        }
    }

    #[test]
    fn time_spent_is_bounded() {
        let with_time = |seconds: i64| UpdateProgressDto {
            enrollment_id: Uuid::new_v4(),
            content_type: ProgressContentType::Lesson,
            content_id: Uuid::new_v4(),
            progress: 0.5,
            time_spent_seconds: Some(seconds),
            metadata: None,
        };
        assert!(with_time(-5).validate().is_err());
        assert!(with_time(MAX_TIME_SPENT_PER_UPDATE + 1).validate().is_err());
        assert!(with_time(i64::MAX).validate().is_err());
        assert!(with_time(MAX_TIME_SPENT_PER_UPDATE).validate().is_ok());
    }

    #[test]
    fn learner_is_student_or_individual() {
        let now = Utc::now();
        let student = Uuid::new_v4();
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            version_id: Uuid::new_v4(),
            student_id: Some(student),
            individual_user_id: None,
            enrolled_by_id: Uuid::new_v4(),
            enrollment_type: EnrollmentType::B2b,
            status: EnrollmentStatus::Enrolled,
            enrolled_at: now,
            completed_at: None,
            progress: 0.0,
            last_activity_at: None,
            completion_score: None,
            certificate_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(enrollment.learner_id(), Some(student));
    }
}
