//! User entities and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use supernova_auth::UserRole;
use supernova_core::serde::{deserialize_optional_bool, deserialize_optional_uuid};
use supernova_core::{MIN_PASSWORD_LENGTH, PaginationMeta, PaginationParams};

use crate::enums::UserStatus;

/// A user account. The password hash is never part of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_active: bool,
    /// Owning school; `None` for super admins and individual users
    pub school_id: Option<Uuid>,
    pub settings: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A user row together with its password hash, for authentication only.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password: String,
}

pub const USER_COLUMNS: &str = "id, email, first_name, last_name, role, status, is_active, \
     school_id, settings, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
    pub role: UserRole,
    /// Required for school roles; school admins may omit it (their own school is used)
    pub school_id: Option<Uuid>,
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub last_name: Option<String>,
    /// Only super admins may change roles
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub settings: Option<Value>,
}

/// Self-service profile update.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMeDto {
    #[validate(length(min = 1, max = 255))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub last_name: Option<String>,
    #[validate(length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    pub role: Option<UserRole>,
    /// Ignored for school-scoped callers
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    /// Matches email, first name or last name
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_fail_validation() {
        let dto = CreateUserDto {
            email: "new@school.edu".to_string(),
            password: "short".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            role: UserRole::Student,
            school_id: None,
            settings: None,
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn user_filters_parse_from_query_text() {
        let school_id = Uuid::new_v4();
        let json = format!(
            r#"{{"role":"teacher","school_id":"{}","is_active":"false","limit":"5"}}"#,
            school_id
        );
        let filters: UserFilterParams = serde_json::from_str(&json).unwrap();
        assert_eq!(filters.role, Some(UserRole::Teacher));
        assert_eq!(filters.school_id, Some(school_id));
        assert_eq!(filters.is_active, Some(false));
        assert_eq!(filters.pagination.limit(), 5);
    }
}
