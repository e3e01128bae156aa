//! # Supernova Models
//!
//! Domain models and DTOs for the Supernova LMS API.
//!
//! Row structs derive [`sqlx::FromRow`], request DTOs derive
//! [`validator::Validate`] and everything that crosses the wire derives
//! [`utoipa::ToSchema`].
//!
//! # Modules
//!
//! - [`enums`]: Postgres enum types shared by the tables
//! - [`auth`]: login, refresh and token responses
//! - [`users`]: users and their filters
//! - [`schools`]: tenants and their statistics
//! - [`courses`]: the course catalog
//! - [`content`]: versions, content, modules and lessons
//! - [`enrollments`]: enrollments and per-content progress
//! - [`purchases`]: D2C purchases and B2B licenses
//! - [`reviews`]: course reviews and rating statistics
//! - [`admin`]: platform-wide aggregates
//! - [`validators`]: custom field validators

pub mod admin;
pub mod auth;
pub mod content;
pub mod courses;
pub mod enrollments;
pub mod enums;
pub mod purchases;
pub mod reviews;
pub mod schools;
pub mod users;
pub mod validators;

pub use supernova_auth::UserRole;

pub use enums::{
    ContentType, CourseStatus, DifficultyLevel, EnrollmentStatus, EnrollmentType,
    PaymentMethod, PaymentStatus, ProgressContentType, ProgressStatus, ReviewStatus,
    SubscriptionStatus, UserStatus,
};
