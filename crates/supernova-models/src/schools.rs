//! School (tenant) entities and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use supernova_core::serde::deserialize_optional_bool;
use supernova_core::{MIN_PASSWORD_LENGTH, PaginationMeta, PaginationParams};

use crate::enums::SubscriptionStatus;
use crate::validators::{validate_school_code, validate_timezone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub domain: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub timezone: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub max_students: i32,
    pub max_teachers: i32,
    pub settings: Option<Value>,
    pub features_enabled: Option<Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership and usage counts for one school.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SchoolStats {
    pub total_students: i64,
    pub total_teachers: i64,
    /// Courses with a currently valid license
    pub licensed_courses: i64,
    /// Enrollments of this school's students that are enrolled or in progress
    pub active_enrollments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolWithStats {
    #[serde(flatten)]
    pub school: School,
    pub stats: SchoolStats,
}

/// The school admin account created together with a school.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSchoolAdminDto {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(custom(function = "validate_school_code"))]
    #[schema(example = "LAGOS-HS")]
    pub code: String,
    pub description: Option<String>,
    #[validate(length(min = 3, max = 255))]
    #[schema(example = "lagos-hs.supernova.dev")]
    pub domain: String,
    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: String,
    #[validate(length(max = 50))]
    pub contact_phone: Option<String>,
    #[validate(custom(function = "validate_timezone"))]
    #[schema(example = "Africa/Lagos")]
    pub timezone: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_students: i32,
    #[validate(range(min = 1))]
    pub max_teachers: i32,
    pub settings: Option<Value>,
    pub features_enabled: Option<Value>,
    #[validate(nested)]
    pub admin: CreateSchoolAdminDto,
}

/// Partial update. School admins may not change the subscription or the
/// capacity fields.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 3, max = 255))]
    pub domain: Option<String>,
    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 50))]
    pub contact_phone: Option<String>,
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_students: Option<i32>,
    #[validate(range(min = 1))]
    pub max_teachers: Option<i32>,
    pub settings: Option<Value>,
    pub features_enabled: Option<Value>,
    pub is_active: Option<bool>,
}

impl UpdateSchoolDto {
    /// Whether the update touches fields reserved for super admins.
    pub fn touches_restricted_fields(&self) -> bool {
        self.subscription_status.is_some()
            || self.max_students.is_some()
            || self.max_teachers.is_some()
            || self.trial_ends_at.is_some()
            || self.is_active.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolFilterParams {
    /// Matches name, code or domain
    pub search: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    /// Include soft-deleted schools (default false)
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub include_inactive: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedSchoolsResponse {
    pub data: Vec<School>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateSchoolDto {
        CreateSchoolDto {
            name: "Lagos High".to_string(),
            code: "LAGOS-HS".to_string(),
            description: None,
            domain: "lagos-hs.supernova.dev".to_string(),
            contact_email: "office@lagos-hs.edu".to_string(),
            contact_phone: None,
            timezone: "Africa/Lagos".to_string(),
            address: None,
            logo_url: None,
            subscription_status: None,
            trial_ends_at: None,
            max_students: 500,
            max_teachers: 40,
            settings: None,
            features_enabled: None,
            admin: CreateSchoolAdminDto {
                email: "head@lagos-hs.edu".to_string(),
                password: "password123".to_string(),
                first_name: "Bola".to_string(),
                last_name: "Ade".to_string(),
            },
        }
    }

    #[test]
    fn valid_school_passes() {
        assert!(dto().validate().is_ok());
    }

    #[test]
    fn capacity_must_be_positive() {
        let mut school = dto();
        school.max_students = 0;
        let errors = school.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("max_students"));
    }

    #[test]
    fn nested_admin_is_validated() {
        let mut school = dto();
        school.admin.password = "short".to_string();
        assert!(school.validate().is_err());
    }

    #[test]
    fn bad_code_and_timezone_are_rejected() {
        let mut school = dto();
        school.code = "lagos hs".to_string();
        school.timezone = "Lagos".to_string();
        let errors = school.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("code"));
        assert!(fields.contains_key("timezone"));
    }

    #[test]
    fn restricted_fields_detection() {
        assert!(!UpdateSchoolDto::default().touches_restricted_fields());
        let update = UpdateSchoolDto {
            max_teachers: Some(10),
            ..Default::default()
        };
        assert!(update.touches_restricted_fields());
    }
}
