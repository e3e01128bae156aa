use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_cache::{RedisCache, invalidate, keys};
use supernova_core::{AppError, PaginationMeta, hash_password};
use supernova_db::{UNIQUE_VIOLATION, constraint_name, is_db_error};
use supernova_models::{SubscriptionStatus, UserRole};
use supernova_models::purchases::VALID_LICENSE_SQL;
use supernova_observability::{track_school_created, track_user_created};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{check_any_role, ensure_school_access};
use crate::utils::auth_helpers::{normalize_email, search_pattern};

use super::model::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolStats,
    SchoolWithStats, UpdateSchoolDto,
};

const SCHOOL_COLUMNS: &str = "id, name, code, description, domain, contact_email, contact_phone, \
     timezone, address, logo_url, subscription_status, trial_ends_at, max_students, max_teachers, \
     settings, features_enabled, is_active, created_at, updated_at";

const SCHOOL_FILTERS: &str = "($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1 OR domain ILIKE $1) \
     AND ($2::subscription_status IS NULL OR subscription_status = $2) \
     AND ($3 OR is_active = TRUE)";

/// Maps unique violations on school and admin inserts to client errors.
fn map_school_conflict(e: sqlx::Error) -> AppError {
    if !is_db_error(&e, UNIQUE_VIOLATION) {
        return e.into();
    }
    match constraint_name(&e).as_deref() {
        Some("schools_code_key") => AppError::conflict(anyhow!("School code already exists")),
        Some("schools_domain_key") => AppError::conflict(anyhow!("School domain already exists")),
        Some("users_email_key") => AppError::bad_request(anyhow!("Email already registered")),
        _ => AppError::conflict(anyhow!("School already exists")),
    }
}

pub struct SchoolService;

impl SchoolService {
    /// Creates the school and its school admin in one transaction.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(db: &PgPool, dto: CreateSchoolDto) -> Result<School, AppError> {
        let admin_email = normalize_email(&dto.admin.email);
        let hashed_password = hash_password(&dto.admin.password)?;

        let mut tx = db.begin().await?;

        let school = sqlx::query_as::<_, School>(&format!(
            "INSERT INTO schools (name, code, description, domain, contact_email, contact_phone,
                 timezone, address, logo_url, subscription_status, trial_ends_at, max_students,
                 max_teachers, settings, features_enabled)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {}",
            SCHOOL_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(&dto.code)
        .bind(&dto.description)
        .bind(dto.domain.trim().to_lowercase())
        .bind(normalize_email(&dto.contact_email))
        .bind(&dto.contact_phone)
        .bind(&dto.timezone)
        .bind(&dto.address)
        .bind(&dto.logo_url)
        .bind(dto.subscription_status.unwrap_or(SubscriptionStatus::Trial))
        .bind(dto.trial_ends_at)
        .bind(dto.max_students)
        .bind(dto.max_teachers)
        .bind(&dto.settings)
        .bind(&dto.features_enabled)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_school_conflict)?;

        let admin_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password, first_name, last_name, role, school_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&admin_email)
        .bind(&hashed_password)
        .bind(dto.admin.first_name.trim())
        .bind(dto.admin.last_name.trim())
        .bind(UserRole::SchoolAdmin)
        .bind(school.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_school_conflict)?;

        tx.commit().await?;

        track_school_created();
        track_user_created(UserRole::SchoolAdmin.as_str());
        info!(school.id = %school.id, user.id = %admin_id, "School created with admin");

        Ok(school)
    }

    /// Loads a school through the cache.
    pub async fn find_school(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
    ) -> Result<School, AppError> {
        let key = keys::schools::by_id(id);
        if let Some(cache) = cache
            && let Some(school) = cache.get::<School>(&key).await
        {
            return Ok(school);
        }

        let school = sqlx::query_as::<_, School>(&format!(
            "SELECT {} FROM schools WHERE id = $1",
            SCHOOL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        if let Some(cache) = cache {
            cache.store(&key, &school).await;
        }
        Ok(school)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn school_stats(db: &PgPool, school_id: Uuid) -> Result<SchoolStats, AppError> {
        let stats = sqlx::query_as::<_, SchoolStats>(&format!(
            "SELECT
                (SELECT COUNT(*) FROM users
                  WHERE school_id = $1 AND role = 'student' AND is_active) AS total_students,
                (SELECT COUNT(*) FROM users
                  WHERE school_id = $1 AND role = 'teacher' AND is_active) AS total_teachers,
                (SELECT COUNT(DISTINCT cl.course_id) FROM course_licenses cl
                  WHERE cl.school_id = $1 AND {}) AS licensed_courses,
                (SELECT COUNT(*) FROM course_enrollments e
                  JOIN users u ON u.id = e.student_id
                  WHERE u.school_id = $1 AND e.status IN ('enrolled', 'in_progress')) AS active_enrollments",
            VALID_LICENSE_SQL
        ))
        .bind(school_id)
        .fetch_one(db)
        .await?;
        Ok(stats)
    }

    #[instrument(skip(db, cache, auth_user), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<SchoolWithStats, AppError> {
        ensure_school_access(auth_user, Some(id))?;

        let school = Self::find_school(db, cache, id).await?;
        let stats = Self::school_stats(db, id).await?;
        Ok(SchoolWithStats { school, stats })
    }

    #[instrument(skip(db, cache, auth_user), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_my_school(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
    ) -> Result<SchoolWithStats, AppError> {
        let school_id = auth_user
            .school_id()
            .ok_or_else(|| AppError::not_found(anyhow!("User is not associated with a school")))?;
        Self::get_school(db, cache, auth_user, school_id).await
    }

    #[instrument(skip(db, cache, auth_user, dto), fields(db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        check_any_role(auth_user, &[UserRole::SuperAdmin, UserRole::SchoolAdmin])?;
        ensure_school_access(auth_user, Some(id))?;
        if !auth_user.is_super_admin() && dto.touches_restricted_fields() {
            return Err(AppError::forbidden(
                "Only super admins can change subscription, capacity or activation settings",
            ));
        }

        let existing = Self::find_school(db, None, id).await?;

        let domain = dto
            .domain
            .as_deref()
            .map(|d| d.trim().to_lowercase())
            .unwrap_or_else(|| existing.domain.clone());
        if domain != existing.domain {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM schools WHERE domain = $1 AND id <> $2)",
            )
            .bind(&domain)
            .bind(id)
            .fetch_one(db)
            .await?;
            if taken {
                return Err(AppError::conflict(anyhow!("School domain already exists")));
            }
        }

        let school = sqlx::query_as::<_, School>(&format!(
            "UPDATE schools
             SET name = $1, description = $2, domain = $3, contact_email = $4, contact_phone = $5,
                 timezone = $6, address = $7, logo_url = $8, subscription_status = $9,
                 trial_ends_at = $10, max_students = $11, max_teachers = $12, settings = $13,
                 features_enabled = $14, is_active = $15, updated_at = NOW()
             WHERE id = $16
             RETURNING {}",
            SCHOOL_COLUMNS
        ))
        .bind(dto.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(dto.description.as_ref().or(existing.description.as_ref()))
        .bind(&domain)
        .bind(
            dto.contact_email
                .as_deref()
                .map(normalize_email)
                .unwrap_or_else(|| existing.contact_email.clone()),
        )
        .bind(dto.contact_phone.as_ref().or(existing.contact_phone.as_ref()))
        .bind(dto.timezone.as_ref().unwrap_or(&existing.timezone))
        .bind(dto.address.as_ref().or(existing.address.as_ref()))
        .bind(dto.logo_url.as_ref().or(existing.logo_url.as_ref()))
        .bind(dto.subscription_status.unwrap_or(existing.subscription_status))
        .bind(dto.trial_ends_at.or(existing.trial_ends_at))
        .bind(dto.max_students.unwrap_or(existing.max_students))
        .bind(dto.max_teachers.unwrap_or(existing.max_teachers))
        .bind(dto.settings.as_ref().or(existing.settings.as_ref()))
        .bind(dto.features_enabled.as_ref().or(existing.features_enabled.as_ref()))
        .bind(dto.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(map_school_conflict)?;

        invalidate::school(cache, id).await;
        Ok(school)
    }

    #[instrument(skip(db, cache), fields(db.operation = "UPDATE", db.table = "schools"))]
    pub async fn delete_school(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE schools SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("School not found")));
        }

        invalidate::school(cache, id).await;
        Ok(())
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn list_schools(
        db: &PgPool,
        filters: SchoolFilterParams,
    ) -> Result<PaginatedSchoolsResponse, AppError> {
        let search = search_pattern(filters.search.as_deref());
        let include_inactive = filters.include_inactive.unwrap_or(false);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM schools WHERE {}",
            SCHOOL_FILTERS
        ))
        .bind(&search)
        .bind(filters.subscription_status)
        .bind(include_inactive)
        .fetch_one(db)
        .await?;

        let schools = sqlx::query_as::<_, School>(&format!(
            "SELECT {} FROM schools WHERE {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            SCHOOL_COLUMNS, SCHOOL_FILTERS
        ))
        .bind(&search)
        .bind(filters.subscription_status)
        .bind(include_inactive)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedSchoolsResponse {
            data: schools,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }
}
