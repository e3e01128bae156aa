use std::time::Instant;

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use supernova_cache::RedisCache;
use supernova_core::AppError;
use supernova_models::purchases::VALID_LICENSE_SQL;
use supernova_models::{UserRole, UserStatus};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{check_any_role, ensure_super_admin};
use crate::modules::users::model::{
    CreateUserDto, PaginatedUsersResponse, USER_COLUMNS, User, UserFilterParams,
};
use crate::modules::users::service::UserService;
use crate::utils::auth_helpers::require_school_id;

use super::model::{ComponentHealth, ComponentStatus, ContentStats, PlatformStats, SystemHealth};

const PLATFORM_STATS_SQL: &str = "SELECT
    (SELECT COUNT(*) FROM users) AS total_users,
    (SELECT COUNT(*) FROM schools) AS total_schools,
    (SELECT COUNT(*) FROM courses WHERE NOT is_deleted) AS total_courses,
    (SELECT COUNT(*) FROM course_enrollments) AS total_enrollments,
    (SELECT COALESCE(SUM(amount_paid), 0)::float8
        FROM course_purchases WHERE payment_status = 'completed') AS total_revenue,
    (SELECT COALESCE(100.0 * COUNT(*) FILTER (WHERE is_active) / NULLIF(COUNT(*), 0), 0)::float8
        FROM users) AS active_users_percentage";

/// `$1` narrows the counts to courses licensed to one school.
fn content_stats_sql() -> String {
    format!(
        "WITH scoped AS (
             SELECT c.id, c.status FROM courses c
             WHERE NOT c.is_deleted
               AND ($1::uuid IS NULL OR EXISTS (
                   SELECT 1 FROM course_licenses cl
                   WHERE cl.course_id = c.id AND cl.school_id = $1 AND {}))
         ),
         scoped_modules AS (
             SELECT m.id FROM modules m
             JOIN course_versions v ON v.content_id = m.content_id AND v.valid_until IS NULL
             JOIN scoped s ON s.id = v.course_id
         )
         SELECT
             (SELECT COUNT(*) FROM scoped) AS total_courses,
             (SELECT COUNT(*) FROM scoped WHERE status = 'published') AS published_courses,
             (SELECT COUNT(*) FROM scoped WHERE status = 'draft') AS draft_courses,
             (SELECT COUNT(*) FROM scoped WHERE status = 'archived') AS archived_courses,
             (SELECT COUNT(*) FROM scoped_modules) AS total_modules,
             (SELECT COUNT(*) FROM lessons l JOIN scoped_modules sm ON sm.id = l.module_id)
                 AS total_lessons,
             (SELECT AVG(r.rating)::float8 FROM course_reviews r
                 JOIN scoped s ON s.id = r.course_id
                 WHERE r.status = 'approved') AS average_rating",
        VALID_LICENSE_SQL
    )
}

fn check_admin_role(role: UserRole) -> Result<(), AppError> {
    if !matches!(role, UserRole::SuperAdmin | UserRole::SchoolAdmin) {
        return Err(AppError::bad_request(anyhow!(
            "Admin users must have role super_admin or school_admin"
        )));
    }
    Ok(())
}

/// The platform is degraded whenever the database is unreachable; a
/// missing cache only slows things down.
fn overall_status(database: &ComponentHealth) -> &'static str {
    if database.status == ComponentStatus::Up {
        "healthy"
    } else {
        "degraded"
    }
}

fn elapsed_ms(started: Instant) -> Option<u64> {
    u64::try_from(started.elapsed().as_millis()).ok()
}

pub struct AdminService;

impl AdminService {
    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT"))]
    pub async fn platform_stats(db: &PgPool, auth_user: &AuthUser) -> Result<PlatformStats, AppError> {
        ensure_super_admin(auth_user)?;

        let stats = sqlx::query_as::<_, PlatformStats>(PLATFORM_STATS_SQL)
            .fetch_one(db)
            .await?;
        Ok(stats)
    }

    async fn database_health(db: &PgPool) -> ComponentHealth {
        let started = Instant::now();
        match sqlx::query("SELECT 1").execute(db).await {
            Ok(_) => ComponentHealth {
                status: ComponentStatus::Up,
                latency_ms: elapsed_ms(started),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                ComponentHealth {
                    status: ComponentStatus::Down,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn cache_health(cache: Option<&RedisCache>) -> ComponentHealth {
        let Some(cache) = cache else {
            return ComponentHealth {
                status: ComponentStatus::Disabled,
                latency_ms: None,
                error: None,
            };
        };

        let started = Instant::now();
        match cache.ping().await {
            Ok(()) => ComponentHealth {
                status: ComponentStatus::Up,
                latency_ms: elapsed_ms(started),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                ComponentHealth {
                    status: ComponentStatus::Down,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    #[instrument(skip(db, cache, auth_user, started_at))]
    pub async fn system_health(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        started_at: Instant,
    ) -> Result<SystemHealth, AppError> {
        ensure_super_admin(auth_user)?;

        let database = Self::database_health(db).await;
        let cache = Self::cache_health(cache).await;

        Ok(SystemHealth {
            status: overall_status(&database).to_string(),
            database,
            cache,
            uptime_seconds: started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    #[instrument(skip(db, auth_user))]
    pub async fn list_users(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        ensure_super_admin(auth_user)?;
        UserService::list_users(db, auth_user, filters).await
    }

    #[instrument(skip(db, auth_user, dto), fields(user.role = %dto.role))]
    pub async fn create_admin_user(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        ensure_super_admin(auth_user)?;
        check_admin_role(dto.role)?;

        let user = UserService::create_user(db, auth_user, dto).await?;
        info!(user.id = %user.id, user.role = %user.role, "Admin user created");
        Ok(user)
    }

    async fn set_user_status(
        db: &PgPool,
        id: Uuid,
        status: UserStatus,
        is_active: bool,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $1, is_active = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(status)
        .bind(is_active)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn suspend_user(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<User, AppError> {
        ensure_super_admin(auth_user)?;
        if id == auth_user.user_id() {
            return Err(AppError::bad_request(anyhow!(
                "You cannot suspend your own account"
            )));
        }

        let user = Self::set_user_status(db, id, UserStatus::Suspended, false).await?;
        info!(user.id = %user.id, "User suspended");
        Ok(user)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn reinstate_user(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<User, AppError> {
        ensure_super_admin(auth_user)?;

        let user = Self::set_user_status(db, id, UserStatus::Active, true).await?;
        info!(user.id = %user.id, "User reinstated");
        Ok(user)
    }

    /// Catalog counts. A school admin only sees the courses their school
    /// currently holds a license for.
    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT"))]
    pub async fn content_stats(db: &PgPool, auth_user: &AuthUser) -> Result<ContentStats, AppError> {
        check_any_role(auth_user, &[UserRole::SuperAdmin, UserRole::SchoolAdmin])?;

        let school_id = if auth_user.is_super_admin() {
            None
        } else {
            Some(require_school_id(auth_user)?)
        };

        let stats = sqlx::query_as::<_, ContentStats>(&content_stats_sql())
            .bind(school_id)
            .fetch_one(db)
            .await?;
        Ok(stats)
    }
}
