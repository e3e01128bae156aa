//! User roles and their hierarchy.
//!
//! ```text
//! super_admin        platform staff, no school
//!   school_admin     runs one school
//!     teacher        staff of one school
//!       student      learner of one school (B2B)
//! individual_user    learner without a school (D2C)
//! ```
//!
//! `individual_user` sits outside the school chain: it ranks at the student
//! level but never inherits school scope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    SchoolAdmin,
    Teacher,
    Student,
    IndividualUser,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::SuperAdmin,
        UserRole::SchoolAdmin,
        UserRole::Teacher,
        UserRole::Student,
        UserRole::IndividualUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::SchoolAdmin => "school_admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::IndividualUser => "individual_user",
        }
    }

    pub fn hierarchy_level(&self) -> u8 {
        match self {
            UserRole::SuperAdmin => 3,
            UserRole::SchoolAdmin => 2,
            UserRole::Teacher => 1,
            UserRole::Student | UserRole::IndividualUser => 0,
        }
    }

    /// Roles that must belong to exactly one school.
    pub fn requires_school(&self) -> bool {
        matches!(
            self,
            UserRole::SchoolAdmin | UserRole::Teacher | UserRole::Student
        )
    }

    /// School staff: may manage enrollments for their school.
    pub fn is_school_staff(&self) -> bool {
        matches!(self, UserRole::SchoolAdmin | UserRole::Teacher)
    }

    pub fn is_learner(&self) -> bool {
        matches!(self, UserRole::Student | UserRole::IndividualUser)
    }

    /// Whether a holder of `self` may create or assign `target`.
    ///
    /// Super admins may assign anything. School admins may assign teacher and
    /// student only. Nobody else assigns roles.
    pub fn can_assign(&self, target: UserRole) -> bool {
        match self {
            UserRole::SuperAdmin => true,
            UserRole::SchoolAdmin => matches!(target, UserRole::Teacher | UserRole::Student),
            _ => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
