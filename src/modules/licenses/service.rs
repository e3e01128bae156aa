use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta};
use supernova_models::purchases::VALID_LICENSE_SQL;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{can_manage_school_members, ensure_super_admin};
use crate::modules::courses::service::CourseService;

use super::model::{
    CreateLicenseDto, License, LicenseCheckResponse, LicenseFilterParams,
    PaginatedLicensesResponse, UpdateLicenseDto,
};

const LICENSE_COLUMNS: &str = "cl.id, cl.course_id, cl.school_id, cl.granted_by_id, \
     cl.valid_from, cl.valid_until, cl.max_students, cl.is_active, cl.created_at, cl.updated_at";

fn check_window(valid_from: DateTime<Utc>, valid_until: Option<DateTime<Utc>>) -> Result<(), AppError> {
    if let Some(until) = valid_until
        && until <= valid_from
    {
        return Err(AppError::bad_request(anyhow!(
            "valid_until must be after valid_from"
        )));
    }
    Ok(())
}

fn ensure_license_access(auth_user: &AuthUser, school_id: Uuid) -> Result<(), AppError> {
    if !can_manage_school_members(auth_user, Some(school_id)) {
        return Err(AppError::forbidden(
            "You don't have permission to view this school's licenses",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum LicenseOwner {
    Course,
    School,
}

impl LicenseOwner {
    fn column(self) -> &'static str {
        match self {
            LicenseOwner::Course => "cl.course_id",
            LicenseOwner::School => "cl.school_id",
        }
    }
}

pub struct LicenseService;

impl LicenseService {
    async fn find_license(db: &PgPool, id: Uuid) -> Result<License, AppError> {
        sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM course_licenses cl WHERE cl.id = $1",
            LICENSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("License not found")))
    }

    async fn ensure_school_exists(db: &PgPool, school_id: Uuid) -> Result<(), AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE id = $1 AND is_active)")
                .bind(school_id)
                .fetch_one(db)
                .await?;
        if !exists {
            return Err(AppError::not_found(anyhow!("School not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_licenses", course.id = %dto.course_id, school.id = %dto.school_id))]
    pub async fn create_license(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreateLicenseDto,
    ) -> Result<License, AppError> {
        ensure_super_admin(auth_user)?;

        let course = CourseService::find_course(db, None, dto.course_id).await?;
        if !course.is_b2b_enabled {
            return Err(AppError::bad_request(anyhow!(
                "Course is not available for school licensing"
            )));
        }
        Self::ensure_school_exists(db, dto.school_id).await?;

        check_window(dto.valid_from.unwrap_or_else(Utc::now), dto.valid_until)?;

        let license = sqlx::query_as::<_, License>(&format!(
            "INSERT INTO course_licenses AS cl
                 (course_id, school_id, granted_by_id, valid_from, valid_until, max_students)
             VALUES ($1, $2, $3, COALESCE($4, NOW()), $5, $6)
             RETURNING {}",
            LICENSE_COLUMNS
        ))
        .bind(dto.course_id)
        .bind(dto.school_id)
        .bind(auth_user.user_id())
        .bind(dto.valid_from)
        .bind(dto.valid_until)
        .bind(dto.max_students)
        .fetch_one(db)
        .await?;

        info!(license.id = %license.id, "License granted");
        Ok(license)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_licenses"))]
    pub async fn get_license(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<License, AppError> {
        let license = Self::find_license(db, id).await?;
        ensure_license_access(auth_user, license.school_id)?;
        Ok(license)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_licenses"))]
    pub async fn update_license(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateLicenseDto,
    ) -> Result<License, AppError> {
        ensure_super_admin(auth_user)?;

        let existing = Self::find_license(db, id).await?;
        let valid_until = dto.valid_until.or(existing.valid_until);
        check_window(existing.valid_from, valid_until)?;

        let license = sqlx::query_as::<_, License>(&format!(
            "UPDATE course_licenses AS cl
             SET valid_until = $1, max_students = $2, is_active = $3, updated_at = NOW()
             WHERE cl.id = $4
             RETURNING {}",
            LICENSE_COLUMNS
        ))
        .bind(valid_until)
        .bind(dto.max_students.or(existing.max_students))
        .bind(dto.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(license)
    }

    async fn list_by(
        db: &PgPool,
        owner: LicenseOwner,
        owner_id: Uuid,
        filters: LicenseFilterParams,
    ) -> Result<PaginatedLicensesResponse, AppError> {
        let filter_sql = format!(
            "{} = $1 AND ($2::bool IS NOT TRUE OR ({}))",
            owner.column(),
            VALID_LICENSE_SQL
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM course_licenses cl WHERE {}",
            filter_sql
        ))
        .bind(owner_id)
        .bind(filters.active_only)
        .fetch_one(db)
        .await?;

        let licenses = sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM course_licenses cl WHERE {}
             ORDER BY cl.created_at DESC
             LIMIT $3 OFFSET $4",
            LICENSE_COLUMNS, filter_sql
        ))
        .bind(owner_id)
        .bind(filters.active_only)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedLicensesResponse {
            data: licenses,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_licenses"))]
    pub async fn list_course_licenses(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
        filters: LicenseFilterParams,
    ) -> Result<PaginatedLicensesResponse, AppError> {
        ensure_super_admin(auth_user)?;
        Self::list_by(db, LicenseOwner::Course, course_id, filters).await
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_licenses"))]
    pub async fn list_school_licenses(
        db: &PgPool,
        auth_user: &AuthUser,
        school_id: Uuid,
        filters: LicenseFilterParams,
    ) -> Result<PaginatedLicensesResponse, AppError> {
        ensure_license_access(auth_user, school_id)?;
        Self::list_by(db, LicenseOwner::School, school_id, filters).await
    }

    /// Whether `school_id` currently holds a valid license for `course_id`,
    /// with the seats its students occupy.
    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_licenses"))]
    pub async fn check_license(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
        school_id: Uuid,
    ) -> Result<LicenseCheckResponse, AppError> {
        ensure_license_access(auth_user, school_id)?;

        let license = sqlx::query_as::<_, License>(&format!(
            "SELECT {} FROM course_licenses cl
             WHERE cl.course_id = $1 AND cl.school_id = $2 AND {}
             ORDER BY cl.valid_until DESC NULLS FIRST
             LIMIT 1",
            LICENSE_COLUMNS, VALID_LICENSE_SQL
        ))
        .bind(course_id)
        .bind(school_id)
        .fetch_optional(db)
        .await?;

        let seats_used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM course_enrollments e
             JOIN users u ON u.id = e.student_id
             WHERE e.course_id = $1 AND u.school_id = $2",
        )
        .bind(course_id)
        .bind(school_id)
        .fetch_one(db)
        .await?;

        Ok(LicenseCheckResponse {
            is_valid: license.is_some(),
            license_id: license.as_ref().map(|l| l.id),
            valid_until: license.as_ref().and_then(|l| l.valid_until),
            seats_used,
            max_students: license.and_then(|l| l.max_students),
        })
    }
}
