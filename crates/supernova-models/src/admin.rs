//! Platform-wide aggregates for super admins.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_schools: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
    /// Sum of completed purchases, all currencies
    pub total_revenue: f64,
    pub active_users_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Up,
    Down,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemHealth {
    /// `healthy` when the database is up, `degraded` otherwise
    pub status: String,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
    pub uptime_seconds: u64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ContentStats {
    pub total_courses: i64,
    pub published_courses: i64,
    pub draft_courses: i64,
    pub archived_courses: i64,
    pub total_modules: i64,
    pub total_lessons: i64,
    /// Mean rating over approved reviews
    pub average_rating: Option<f64>,
}
