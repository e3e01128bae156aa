use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_cache::{RedisCache, invalidate, keys};
use supernova_core::{AppError, PaginationMeta};
use supernova_db::{UNIQUE_VIOLATION, constraint_name, is_db_error};
use supernova_models::CourseStatus;
use supernova_models::content::{CourseModule, Lesson};
use supernova_models::purchases::VALID_LICENSE_SQL;
use supernova_observability::track_course_created;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::ensure_super_admin;
use crate::utils::auth_helpers::search_pattern;

use super::model::{
    ContentTree, Course, CourseContent, CourseDetail, CourseFilterParams, CourseVersion,
    CourseVersionDetail, CreateCourseDto, CreateVersionDto, PaginatedCoursesResponse,
    UpdateContentDto, UpdateCourseDto,
};

pub(crate) const COURSE_COLUMNS: &str = "id, title, description, code, status, difficulty_level, \
     tags, learning_objectives, target_audience, prerequisites, estimated_duration, grade_level, \
     academic_year, sequence_number, cover_image_url, settings, is_b2b_enabled, is_d2c_enabled, \
     base_price, currency, pricing_type, created_by_id, is_deleted, deleted_at, created_at, updated_at";

pub(crate) const CONTENT_COLUMNS: &str = "id, syllabus_url, start_date, end_date, duration_weeks, \
     content_status, last_reviewed_by_id, last_reviewed_at, resources, created_at, updated_at";

pub(crate) const VERSION_COLUMNS: &str =
    "id, course_id, version, content_id, valid_from, valid_until, changelog, created_at, updated_at";

pub(crate) const MODULE_COLUMNS: &str = "id, content_id, title, description, sequence_number, \
     duration_weeks, status, completion_criteria, is_mandatory, created_at, updated_at";

pub(crate) const LESSON_COLUMNS: &str = "id, module_id, title, description, sequence_number, \
     content_type, content, duration_minutes, is_mandatory, completion_criteria, created_at, updated_at";

const NO_COURSE_ACCESS: &str = "You don't have access to this course";

/// Visibility of course `c` for a caller bound as `$1` (is super admin),
/// `$2` (user id) and `$3` (school id).
///
/// Super admins see every live course. School members see courses their
/// school holds a valid license for. Individual users see published D2C
/// courses and anything they are enrolled in.
pub(crate) fn course_visibility_sql() -> String {
    format!(
        "c.is_deleted = FALSE AND (
            $1
            OR ($3::uuid IS NULL AND (
                (c.is_d2c_enabled AND c.status = 'published')
                OR EXISTS (SELECT 1 FROM course_enrollments ce
                           WHERE ce.course_id = c.id AND ce.individual_user_id = $2)))
            OR ($3::uuid IS NOT NULL AND EXISTS (
                SELECT 1 FROM course_licenses cl
                WHERE cl.course_id = c.id AND cl.school_id = $3 AND {})))",
        VALID_LICENSE_SQL
    )
}

/// The bind values for [`course_visibility_sql`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct CourseScope {
    pub is_super_admin: bool,
    pub user_id: Uuid,
    pub school_id: Option<Uuid>,
}

impl CourseScope {
    pub fn of(auth_user: &AuthUser) -> Self {
        Self {
            is_super_admin: auth_user.is_super_admin(),
            user_id: auth_user.user_id(),
            school_id: if auth_user.is_super_admin() {
                None
            } else {
                auth_user.school_id()
            },
        }
    }
}

const COURSE_FILTERS: &str = "($4::course_status IS NULL OR c.status = $4) \
     AND ($5::text IS NULL OR c.title ILIKE $5 OR c.description ILIKE $5 OR c.code ILIKE $5) \
     AND ($6::difficulty_level IS NULL OR c.difficulty_level = $6)";

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn map_course_conflict(e: sqlx::Error) -> AppError {
    if is_db_error(&e, UNIQUE_VIOLATION) {
        return match constraint_name(&e).as_deref() {
            Some("courses_code_key") => AppError::conflict(anyhow!("Course code already exists")),
            Some("course_versions_label_unique") => {
                AppError::conflict(anyhow!("Version label already exists for this course"))
            }
            Some("course_versions_one_current") => AppError::conflict(anyhow!(
                "Another version of this course was published concurrently"
            )),
            _ => AppError::conflict(anyhow!("Course already exists")),
        };
    }
    e.into()
}

/// Applies a partial update to a course, leaving the lifecycle checks to the
/// caller.
fn merge_course(mut course: Course, dto: UpdateCourseDto) -> Course {
    if let Some(title) = dto.title {
        course.title = title.trim().to_string();
    }
    if let Some(description) = dto.description {
        course.description = Some(description);
    }
    if let Some(code) = dto.code {
        course.code = normalize_code(&code);
    }
    if let Some(status) = dto.status {
        course.status = status;
    }
    if let Some(level) = dto.difficulty_level {
        course.difficulty_level = level;
    }
    if let Some(tags) = dto.tags {
        course.tags = tags;
    }
    if let Some(objectives) = dto.learning_objectives {
        course.learning_objectives = objectives;
    }
    if let Some(audience) = dto.target_audience {
        course.target_audience = audience;
    }
    if let Some(prerequisites) = dto.prerequisites {
        course.prerequisites = prerequisites;
    }
    course.estimated_duration = dto.estimated_duration.or(course.estimated_duration);
    course.grade_level = dto.grade_level.or(course.grade_level);
    course.academic_year = dto.academic_year.or(course.academic_year);
    course.sequence_number = dto.sequence_number.unwrap_or(course.sequence_number);
    course.cover_image_url = dto.cover_image_url.or(course.cover_image_url);
    course.settings = dto.settings.or(course.settings);
    course.is_b2b_enabled = dto.is_b2b_enabled.unwrap_or(course.is_b2b_enabled);
    course.is_d2c_enabled = dto.is_d2c_enabled.unwrap_or(course.is_d2c_enabled);
    course.base_price = dto.base_price.or(course.base_price);
    course.currency = dto.currency.or(course.currency);
    course.pricing_type = dto.pricing_type.or(course.pricing_type);
    course
}

fn check_transition(from: CourseStatus, to: CourseStatus) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::bad_request(anyhow!(
            "Invalid status transition from {} to {}",
            from,
            to
        )));
    }
    Ok(())
}

fn check_publishable(course: &Course, has_current_version: bool) -> Result<(), AppError> {
    let mut missing = course.missing_publish_fields();
    if !has_current_version {
        missing.push("current version");
    }
    if !missing.is_empty() {
        return Err(AppError::bad_request(anyhow!(
            "Cannot publish course, missing: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

pub struct CourseService;

impl CourseService {
    async fn ensure_code_available(
        db: &PgPool,
        code: &str,
        except: Option<Uuid>,
    ) -> Result<(), AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(except)
        .fetch_one(db)
        .await?;
        if taken {
            return Err(AppError::conflict(anyhow!("Course code already exists")));
        }
        Ok(())
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "courses"))]
    pub async fn create_course(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        ensure_super_admin(auth_user)?;

        let code = normalize_code(&dto.code);
        Self::ensure_code_available(db, &code, None).await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (title, description, code, status, difficulty_level, tags,
                 learning_objectives, target_audience, prerequisites, estimated_duration,
                 grade_level, academic_year, sequence_number, cover_image_url, settings,
                 is_b2b_enabled, is_d2c_enabled, base_price, currency, pricing_type, created_by_id)
             VALUES ($1, $2, $3, 'draft', $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                 $15, $16, $17, $18, $19, $20)
             RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(&code)
        .bind(dto.difficulty_level)
        .bind(&dto.tags)
        .bind(&dto.learning_objectives)
        .bind(&dto.target_audience)
        .bind(&dto.prerequisites)
        .bind(dto.estimated_duration)
        .bind(&dto.grade_level)
        .bind(&dto.academic_year)
        .bind(dto.sequence_number.unwrap_or(1))
        .bind(&dto.cover_image_url)
        .bind(&dto.settings)
        .bind(dto.is_b2b_enabled.unwrap_or(true))
        .bind(dto.is_d2c_enabled.unwrap_or(false))
        .bind(dto.base_price)
        .bind(&dto.currency)
        .bind(&dto.pricing_type)
        .bind(auth_user.user_id())
        .fetch_one(db)
        .await
        .map_err(map_course_conflict)?;

        track_course_created();
        info!(course.id = %course.id, course.code = %course.code, "Course created");
        Ok(course)
    }

    /// Loads a live (not deleted) course through the cache.
    pub async fn find_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        id: Uuid,
    ) -> Result<Course, AppError> {
        let key = keys::courses::by_id(id);
        if let Some(cache) = cache
            && let Some(course) = cache.get::<Course>(&key).await
        {
            return Ok(course);
        }

        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1 AND is_deleted = FALSE",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))?;

        if let Some(cache) = cache {
            cache.store(&key, &course).await;
        }
        Ok(course)
    }

    /// Fails with 403 unless the caller may see `course_id`.
    pub async fn ensure_course_access(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
    ) -> Result<(), AppError> {
        if auth_user.is_super_admin() {
            return Ok(());
        }
        let scope = CourseScope::of(auth_user);
        let visible: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM courses c WHERE c.id = $4 AND {})",
            course_visibility_sql()
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(course_id)
        .fetch_one(db)
        .await?;

        if !visible {
            return Err(AppError::forbidden(NO_COURSE_ACCESS));
        }
        Ok(())
    }

    /// Fails with 403 unless some visible course uses `content_id`.
    pub async fn ensure_content_access(
        db: &PgPool,
        auth_user: &AuthUser,
        content_id: Uuid,
    ) -> Result<(), AppError> {
        if auth_user.is_super_admin() {
            return Ok(());
        }
        let scope = CourseScope::of(auth_user);
        let visible: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(
                SELECT 1 FROM course_versions v
                JOIN courses c ON c.id = v.course_id
                WHERE v.content_id = $4 AND {})",
            course_visibility_sql()
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(content_id)
        .fetch_one(db)
        .await?;

        if !visible {
            return Err(AppError::forbidden(NO_COURSE_ACCESS));
        }
        Ok(())
    }

    pub async fn current_version(
        db: &PgPool,
        course_id: Uuid,
    ) -> Result<Option<CourseVersion>, AppError> {
        let version = sqlx::query_as::<_, CourseVersion>(&format!(
            "SELECT {} FROM course_versions WHERE course_id = $1 AND valid_until IS NULL",
            VERSION_COLUMNS
        ))
        .bind(course_id)
        .fetch_optional(db)
        .await?;
        Ok(version)
    }

    /// Content with its modules and lessons, in sequence order.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "course_contents"))]
    pub async fn content_tree(db: &PgPool, content_id: Uuid) -> Result<ContentTree, AppError> {
        let content = Self::find_content(db, content_id).await?;

        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM modules WHERE content_id = $1 ORDER BY sequence_number, created_at",
            MODULE_COLUMNS
        ))
        .bind(content_id)
        .fetch_all(db)
        .await?;

        let lessons = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons
             WHERE module_id IN (SELECT id FROM modules WHERE content_id = $1)
             ORDER BY sequence_number, created_at",
            LESSON_COLUMNS
        ))
        .bind(content_id)
        .fetch_all(db)
        .await?;

        Ok(ContentTree::assemble(content, modules, lessons))
    }

    #[instrument(skip(db, cache, auth_user), fields(db.operation = "SELECT", db.table = "courses"))]
    pub async fn get_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<CourseDetail, AppError> {
        let course = Self::find_course(db, cache, id).await?;
        Self::ensure_course_access(db, auth_user, id).await?;

        let current_version = Self::current_version(db, id).await?;
        let content = match &current_version {
            Some(version) => Some(Self::content_tree(db, version.content_id).await?),
            None => None,
        };

        Ok(CourseDetail {
            course,
            current_version,
            content,
        })
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "courses"))]
    pub async fn list_courses(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: CourseFilterParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        let scope = CourseScope::of(auth_user);
        let search = search_pattern(filters.search.as_deref());
        let visibility = course_visibility_sql();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM courses c WHERE {} AND {}",
            visibility, COURSE_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.status)
        .bind(&search)
        .bind(filters.difficulty_level)
        .fetch_one(db)
        .await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses c WHERE {} AND {}
             ORDER BY c.created_at DESC LIMIT $7 OFFSET $8",
            COURSE_COLUMNS, visibility, COURSE_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.status)
        .bind(&search)
        .bind(filters.difficulty_level)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedCoursesResponse {
            data: courses,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, cache, auth_user, dto), fields(db.operation = "UPDATE", db.table = "courses"))]
    pub async fn update_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        ensure_super_admin(auth_user)?;

        let existing = Self::find_course(db, None, id).await?;
        let previous_status = existing.status;
        let previous_code = existing.code.clone();
        let course = merge_course(existing, dto);

        if course.code != previous_code {
            Self::ensure_code_available(db, &course.code, Some(id)).await?;
        }

        check_transition(previous_status, course.status)?;
        if course.status == CourseStatus::Published {
            let has_current_version = Self::current_version(db, id).await?.is_some();
            check_publishable(&course, has_current_version)?;
        }

        let updated = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses
             SET title = $1, description = $2, code = $3, status = $4, difficulty_level = $5,
                 tags = $6, learning_objectives = $7, target_audience = $8, prerequisites = $9,
                 estimated_duration = $10, grade_level = $11, academic_year = $12,
                 sequence_number = $13, cover_image_url = $14, settings = $15,
                 is_b2b_enabled = $16, is_d2c_enabled = $17, base_price = $18, currency = $19,
                 pricing_type = $20, updated_at = NOW()
             WHERE id = $21 AND is_deleted = FALSE
             RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.code)
        .bind(course.status)
        .bind(course.difficulty_level)
        .bind(&course.tags)
        .bind(&course.learning_objectives)
        .bind(&course.target_audience)
        .bind(&course.prerequisites)
        .bind(course.estimated_duration)
        .bind(&course.grade_level)
        .bind(&course.academic_year)
        .bind(course.sequence_number)
        .bind(&course.cover_image_url)
        .bind(&course.settings)
        .bind(course.is_b2b_enabled)
        .bind(course.is_d2c_enabled)
        .bind(course.base_price)
        .bind(&course.currency)
        .bind(&course.pricing_type)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(map_course_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))?;

        invalidate::course(cache, id).await;
        Ok(updated)
    }

    #[instrument(skip(db, cache, auth_user), fields(db.operation = "UPDATE", db.table = "courses"))]
    pub async fn delete_course(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<(), AppError> {
        ensure_super_admin(auth_user)?;

        let result = sqlx::query(
            "UPDATE courses SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Course not found")));
        }

        invalidate::course(cache, id).await;
        Ok(())
    }

    /// Creates content and a new current version, closing the previous
    /// current version in the same transaction.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_versions"))]
    pub async fn create_version(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
        dto: CreateVersionDto,
    ) -> Result<CourseVersionDetail, AppError> {
        ensure_super_admin(auth_user)?;

        let mut tx = db.begin().await?;

        // Serializes concurrent version rotation on the same course
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 AND is_deleted = FALSE FOR UPDATE")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(AppError::not_found(anyhow!("Course not found")));
        }

        let content = sqlx::query_as::<_, CourseContent>(&format!(
            "INSERT INTO course_contents (syllabus_url, start_date, end_date, duration_weeks, resources)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(&dto.content.syllabus_url)
        .bind(dto.content.start_date)
        .bind(dto.content.end_date)
        .bind(dto.content.duration_weeks)
        .bind(&dto.content.resources)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE course_versions SET valid_until = NOW(), updated_at = NOW()
             WHERE course_id = $1 AND valid_until IS NULL",
        )
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        let version = sqlx::query_as::<_, CourseVersion>(&format!(
            "INSERT INTO course_versions (course_id, version, content_id, valid_from, changelog)
             VALUES ($1, $2, $3, NOW(), $4)
             RETURNING {}",
            VERSION_COLUMNS
        ))
        .bind(course_id)
        .bind(dto.version.trim())
        .bind(content.id)
        .bind(&dto.changelog)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_course_conflict)?;

        tx.commit().await?;

        info!(course.id = %course_id, version = %version.version, "Course version created");
        Ok(CourseVersionDetail { version, content })
    }

    /// All versions of a course, newest first.
    #[instrument(skip(db, cache, auth_user), fields(db.operation = "SELECT", db.table = "course_versions"))]
    pub async fn list_versions(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        course_id: Uuid,
    ) -> Result<Vec<CourseVersion>, AppError> {
        Self::find_course(db, cache, course_id).await?;
        Self::ensure_course_access(db, auth_user, course_id).await?;

        let versions = sqlx::query_as::<_, CourseVersion>(&format!(
            "SELECT {} FROM course_versions WHERE course_id = $1
             ORDER BY valid_from DESC, created_at DESC",
            VERSION_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(db)
        .await?;
        Ok(versions)
    }

    pub async fn find_content(db: &PgPool, content_id: Uuid) -> Result<CourseContent, AppError> {
        sqlx::query_as::<_, CourseContent>(&format!(
            "SELECT {} FROM course_contents WHERE id = $1",
            CONTENT_COLUMNS
        ))
        .bind(content_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Course content not found")))
    }

    /// Updates content fields. A status change records the reviewer.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_contents"))]
    pub async fn update_content(
        db: &PgPool,
        auth_user: &AuthUser,
        content_id: Uuid,
        dto: UpdateContentDto,
    ) -> Result<CourseContent, AppError> {
        ensure_super_admin(auth_user)?;

        let existing = Self::find_content(db, content_id).await?;
        let start_date = dto.start_date.unwrap_or(existing.start_date);
        let end_date = dto.end_date.unwrap_or(existing.end_date);
        if end_date < start_date {
            return Err(AppError::bad_request(anyhow!(
                "end_date must not be before start_date"
            )));
        }

        let (reviewed_by, reviewed_at) = match dto.content_status {
            Some(_) => (Some(auth_user.user_id()), Some(chrono::Utc::now())),
            None => (existing.last_reviewed_by_id, existing.last_reviewed_at),
        };

        let content = sqlx::query_as::<_, CourseContent>(&format!(
            "UPDATE course_contents
             SET syllabus_url = $1, start_date = $2, end_date = $3, duration_weeks = $4,
                 content_status = $5, resources = $6, last_reviewed_by_id = $7,
                 last_reviewed_at = $8, updated_at = NOW()
             WHERE id = $9
             RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(dto.syllabus_url.as_ref().or(existing.syllabus_url.as_ref()))
        .bind(start_date)
        .bind(end_date)
        .bind(dto.duration_weeks.or(existing.duration_weeks))
        .bind(dto.content_status.unwrap_or(existing.content_status))
        .bind(dto.resources.as_ref().or(existing.resources.as_ref()))
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(content_id)
        .fetch_one(db)
        .await?;

        Ok(content)
    }
}
