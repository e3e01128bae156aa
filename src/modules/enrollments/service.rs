use anyhow::anyhow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta};
use supernova_db::{UNIQUE_VIOLATION, is_db_error};
use supernova_models::purchases::{ACTIVE_PURCHASE_SQL, VALID_LICENSE_SQL};
use supernova_models::{EnrollmentStatus, ProgressContentType, ProgressStatus, UserRole};
use supernova_observability::track_enrollment_created;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{
    can_view_enrollment, check_any_role, ensure_can_record_progress,
    ensure_can_update_enrollment,
};
use crate::modules::courses::service::CourseService;
use crate::utils::auth_helpers::require_school_id;

use super::model::{
    EnrollIndividualDto, EnrollStudentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentProgress, PaginatedEnrollmentsResponse, ProgressUpdateResponse,
    UpdateEnrollmentStatusDto, UpdateProgressDto, UserProgress,
};

pub(crate) const ENROLLMENT_COLUMNS: &str = "id, course_id, version_id, student_id, \
     individual_user_id, enrolled_by_id, enrollment_type, status, enrolled_at, completed_at, \
     progress, last_activity_at, completion_score, certificate_id, created_at, updated_at";

const PROGRESS_COLUMNS: &str = "id, enrollment_id, content_type, content_id, status, progress, \
     started_at, completed_at, last_interaction, time_spent_seconds, progress_metadata, \
     created_at, updated_at";

/// `$1` is super admin, `$2` the caller, `$3` the staff member's school.
const ENROLLMENT_SCOPE: &str = "($1 \
     OR e.student_id = $2 \
     OR e.individual_user_id = $2 \
     OR ($3::uuid IS NOT NULL AND EXISTS (
         SELECT 1 FROM users u WHERE u.id = e.student_id AND u.school_id = $3)))";

const ENROLLMENT_FILTERS: &str = "($4::uuid IS NULL OR e.course_id = $4) \
     AND ($5::enrollment_status IS NULL OR e.status = $5)";

#[derive(sqlx::FromRow)]
struct SeatLicense {
    id: Uuid,
    max_students: Option<i32>,
}

/// Mean lesson progress over every lesson of the enrolled content. Content
/// without lessons falls back to the course-level progress row.
fn aggregate_progress(lesson_total: f64, lesson_count: i64, course_level: Option<f64>) -> f64 {
    if lesson_count > 0 {
        (lesson_total / lesson_count as f64).clamp(0.0, 1.0)
    } else {
        course_level.unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

fn next_status(current: EnrollmentStatus, aggregate: f64) -> EnrollmentStatus {
    if aggregate >= 1.0 {
        EnrollmentStatus::Completed
    } else if current == EnrollmentStatus::Enrolled {
        EnrollmentStatus::InProgress
    } else {
        current
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    async fn find_enrollment(db: &PgPool, id: Uuid) -> Result<Enrollment, AppError> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM course_enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))
    }

    /// School of the enrolled student, `None` for D2C enrollments.
    async fn student_school(db: &PgPool, enrollment: &Enrollment) -> Result<Option<Uuid>, AppError> {
        let Some(student_id) = enrollment.student_id else {
            return Ok(None);
        };
        let school: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT school_id FROM users WHERE id = $1")
                .bind(student_id)
                .fetch_optional(db)
                .await?;
        Ok(school.flatten())
    }

    async fn current_version_id(
        tx: &mut Transaction<'_, Postgres>,
        course_id: Uuid,
    ) -> Result<Uuid, AppError> {
        sqlx::query_scalar(
            "SELECT id FROM course_versions WHERE course_id = $1 AND valid_until IS NULL",
        )
        .bind(course_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Course has no active version")))
    }

    /// B2B enrollment of a student by school staff, against the school's
    /// license and its seat limit.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_enrollments"))]
    pub async fn enroll_student(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: EnrollStudentDto,
    ) -> Result<Enrollment, AppError> {
        check_any_role(auth_user, &[UserRole::SchoolAdmin, UserRole::Teacher])?;
        let school_id = require_school_id(auth_user)?;

        CourseService::find_course(db, None, dto.course_id).await?;

        let mut tx = db.begin().await?;

        // The license row lock serializes seat counting per school and course
        let license = sqlx::query_as::<_, SeatLicense>(&format!(
            "SELECT cl.id, cl.max_students FROM course_licenses cl
             WHERE cl.course_id = $1 AND cl.school_id = $2 AND {}
             ORDER BY cl.valid_until DESC NULLS FIRST
             LIMIT 1
             FOR UPDATE",
            VALID_LICENSE_SQL
        ))
        .bind(dto.course_id)
        .bind(school_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(anyhow!("School does not have a license for this course"))
        })?;

        let is_student: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users
             WHERE id = $1 AND school_id = $2 AND role = 'student' AND is_active)",
        )
        .bind(dto.student_id)
        .bind(school_id)
        .fetch_one(&mut *tx)
        .await?;
        if !is_student {
            return Err(AppError::not_found(anyhow!("Student not found in school")));
        }

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM course_enrollments WHERE course_id = $1 AND student_id = $2)",
        )
        .bind(dto.course_id)
        .bind(dto.student_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(AppError::bad_request(anyhow!(
                "Student is already enrolled in this course"
            )));
        }

        if let Some(max) = license.max_students {
            let seats_used: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM course_enrollments e
                 JOIN users u ON u.id = e.student_id
                 WHERE e.course_id = $1 AND u.school_id = $2",
            )
            .bind(dto.course_id)
            .bind(school_id)
            .fetch_one(&mut *tx)
            .await?;
            if seats_used >= i64::from(max) {
                return Err(AppError::bad_request(anyhow!("License seat limit reached")));
            }
        }

        let version_id = Self::current_version_id(&mut tx, dto.course_id).await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO course_enrollments
                 (course_id, version_id, student_id, enrolled_by_id, enrollment_type)
             VALUES ($1, $2, $3, $4, 'b2b')
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.course_id)
        .bind(version_id)
        .bind(dto.student_id)
        .bind(auth_user.user_id())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_db_error(&e, UNIQUE_VIOLATION) {
                return AppError::bad_request(anyhow!("Student is already enrolled in this course"));
            }
            e.into()
        })?;

        tx.commit().await?;

        track_enrollment_created("b2b");
        info!(
            enrollment.id = %enrollment.id,
            license.id = %license.id,
            "Student enrolled"
        );
        Ok(enrollment)
    }

    /// D2C self-enrollment. Priced courses need an active purchase.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_enrollments"))]
    pub async fn enroll_individual(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: EnrollIndividualDto,
    ) -> Result<Enrollment, AppError> {
        check_any_role(auth_user, &[UserRole::IndividualUser])?;
        let user_id = auth_user.user_id();

        let course = CourseService::find_course(db, None, dto.course_id).await?;
        if !course.is_publicly_available() {
            return Err(AppError::bad_request(anyhow!(
                "Course is not available for individual enrollment"
            )));
        }

        if course.base_price.is_some() {
            let purchased: bool = sqlx::query_scalar(&format!(
                "SELECT EXISTS(SELECT 1 FROM course_purchases
                 WHERE course_id = $1 AND user_id = $2 AND {})",
                ACTIVE_PURCHASE_SQL
            ))
            .bind(course.id)
            .bind(user_id)
            .fetch_one(db)
            .await?;
            if !purchased {
                return Err(AppError::bad_request(anyhow!(
                    "Course must be purchased before enrollment"
                )));
            }
        }

        let mut tx = db.begin().await?;
        let version_id = Self::current_version_id(&mut tx, course.id).await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO course_enrollments
                 (course_id, version_id, individual_user_id, enrolled_by_id, enrollment_type)
             VALUES ($1, $2, $3, $3, 'd2c')
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(course.id)
        .bind(version_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_db_error(&e, UNIQUE_VIOLATION) {
                return AppError::bad_request(anyhow!("Already enrolled in this course"));
            }
            e.into()
        })?;

        tx.commit().await?;

        track_enrollment_created("d2c");
        info!(enrollment.id = %enrollment.id, "Individual user enrolled");
        Ok(enrollment)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_enrollments"))]
    pub async fn update_status(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateEnrollmentStatusDto,
    ) -> Result<Enrollment, AppError> {
        let enrollment = Self::find_enrollment(db, id).await?;
        let school = Self::student_school(db, &enrollment).await?;
        ensure_can_update_enrollment(auth_user, &enrollment, school)?;

        let updated = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE course_enrollments
             SET status = $1,
                 completed_at = CASE WHEN $1 = 'completed'::enrollment_status
                                     THEN COALESCE(completed_at, NOW())
                                     ELSE completed_at END,
                 updated_at = NOW()
             WHERE id = $2
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.status)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(updated)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_enrollments"))]
    pub async fn list_enrollments(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: EnrollmentFilterParams,
    ) -> Result<PaginatedEnrollmentsResponse, AppError> {
        let staff_school = if auth_user.is_school_staff() {
            auth_user.school_id()
        } else {
            None
        };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM course_enrollments e WHERE {} AND {}",
            ENROLLMENT_SCOPE, ENROLLMENT_FILTERS
        ))
        .bind(auth_user.is_super_admin())
        .bind(auth_user.user_id())
        .bind(staff_school)
        .bind(filters.course_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM course_enrollments e WHERE {} AND {}
             ORDER BY e.enrolled_at DESC
             LIMIT $6 OFFSET $7",
            ENROLLMENT_COLUMNS, ENROLLMENT_SCOPE, ENROLLMENT_FILTERS
        ))
        .bind(auth_user.is_super_admin())
        .bind(auth_user.user_id())
        .bind(staff_school)
        .bind(filters.course_id)
        .bind(filters.status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedEnrollmentsResponse {
            data: enrollments,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "user_progress"))]
    pub async fn get_progress(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<EnrollmentProgress, AppError> {
        let enrollment = Self::find_enrollment(db, id).await?;
        let school = Self::student_school(db, &enrollment).await?;
        if !can_view_enrollment(auth_user, &enrollment, school) {
            return Err(AppError::forbidden(
                "You don't have permission to view this enrollment",
            ));
        }

        let progress = sqlx::query_as::<_, UserProgress>(&format!(
            "SELECT {} FROM user_progress WHERE enrollment_id = $1
             ORDER BY content_type, last_interaction DESC NULLS LAST",
            PROGRESS_COLUMNS
        ))
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(EnrollmentProgress {
            enrollment,
            progress,
        })
    }

    /// Fails unless `content_id` is part of the enrolled version.
    async fn ensure_content_in_version(
        tx: &mut Transaction<'_, Postgres>,
        enrollment: &Enrollment,
        content_type: ProgressContentType,
        content_id: Uuid,
    ) -> Result<(), AppError> {
        let belongs: bool = match content_type {
            ProgressContentType::Course => content_id == enrollment.course_id,
            ProgressContentType::Module => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM modules m
                     JOIN course_versions v ON v.content_id = m.content_id
                     WHERE m.id = $1 AND v.id = $2)",
                )
                .bind(content_id)
                .bind(enrollment.version_id)
                .fetch_one(&mut **tx)
                .await?
            }
            ProgressContentType::Lesson => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM lessons l
                     JOIN modules m ON m.id = l.module_id
                     JOIN course_versions v ON v.content_id = m.content_id
                     WHERE l.id = $1 AND v.id = $2)",
                )
                .bind(content_id)
                .bind(enrollment.version_id)
                .fetch_one(&mut **tx)
                .await?
            }
        };

        if !belongs {
            return Err(AppError::bad_request(anyhow!(
                "Content does not belong to this enrollment"
            )));
        }
        Ok(())
    }

    /// Records progress on one piece of content and recomputes the
    /// enrollment aggregate. The enrollment row stays locked until commit.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPSERT", db.table = "user_progress", enrollment.id = %dto.enrollment_id))]
    pub async fn update_progress(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: UpdateProgressDto,
    ) -> Result<ProgressUpdateResponse, AppError> {
        let mut tx = db.begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM course_enrollments WHERE id = $1 FOR UPDATE",
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.enrollment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        let school = Self::student_school(db, &enrollment).await?;
        ensure_can_record_progress(auth_user, &enrollment, school)?;

        if !enrollment.status.accepts_progress() {
            return Err(AppError::bad_request(anyhow!(
                "Cannot record progress on a dropped or suspended enrollment"
            )));
        }

        Self::ensure_content_in_version(&mut tx, &enrollment, dto.content_type, dto.content_id)
            .await?;

        let status = ProgressStatus::from_progress(dto.progress);
        let progress = sqlx::query_as::<_, UserProgress>(&format!(
            "INSERT INTO user_progress
                 (enrollment_id, content_type, content_id, status, progress, started_at,
                  completed_at, last_interaction, time_spent_seconds, progress_metadata)
             VALUES ($1, $2, $3, $4, $5, NOW(),
                     CASE WHEN $4 = 'completed'::progress_status THEN NOW() END,
                     NOW(), $6, $7)
             ON CONFLICT (enrollment_id, content_type, content_id) DO UPDATE
             SET status = EXCLUDED.status,
                 progress = EXCLUDED.progress,
                 started_at = COALESCE(user_progress.started_at, EXCLUDED.started_at),
                 completed_at = CASE WHEN EXCLUDED.status = 'completed'::progress_status
                                     THEN COALESCE(user_progress.completed_at, NOW())
                                     ELSE NULL END,
                 last_interaction = NOW(),
                 time_spent_seconds = user_progress.time_spent_seconds + EXCLUDED.time_spent_seconds,
                 progress_metadata = COALESCE(EXCLUDED.progress_metadata, user_progress.progress_metadata),
                 updated_at = NOW()
             RETURNING {}",
            PROGRESS_COLUMNS
        ))
        .bind(enrollment.id)
        .bind(dto.content_type)
        .bind(dto.content_id)
        .bind(status)
        .bind(dto.progress)
        .bind(dto.time_spent_seconds.unwrap_or(0))
        .bind(&dto.metadata)
        .fetch_one(&mut *tx)
        .await?;

        let (lesson_count, lesson_total): (i64, f64) = sqlx::query_as(
            "SELECT COUNT(l.id), COALESCE(SUM(up.progress), 0.0)::float8
             FROM course_versions v
             JOIN modules m ON m.content_id = v.content_id
             JOIN lessons l ON l.module_id = m.id
             LEFT JOIN user_progress up
                 ON up.enrollment_id = $1 AND up.content_type = 'lesson' AND up.content_id = l.id
             WHERE v.id = $2",
        )
        .bind(enrollment.id)
        .bind(enrollment.version_id)
        .fetch_one(&mut *tx)
        .await?;

        let course_level: Option<f64> = sqlx::query_scalar(
            "SELECT progress FROM user_progress
             WHERE enrollment_id = $1 AND content_type = 'course' AND content_id = $2",
        )
        .bind(enrollment.id)
        .bind(enrollment.course_id)
        .fetch_optional(&mut *tx)
        .await?;

        let aggregate = aggregate_progress(lesson_total, lesson_count, course_level);
        let next = next_status(enrollment.status, aggregate);

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE course_enrollments
             SET progress = $1, status = $2, last_activity_at = NOW(),
                 completed_at = CASE WHEN $2 = 'completed'::enrollment_status
                                     THEN COALESCE(completed_at, NOW())
                                     ELSE completed_at END,
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(aggregate)
        .bind(next)
        .bind(enrollment.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProgressUpdateResponse {
            progress,
            enrollment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_is_mean_over_all_lessons() {
        // Two of four lessons done, one half done
        assert_eq!(aggregate_progress(2.5, 4, None), 0.625);
        assert_eq!(aggregate_progress(0.0, 3, Some(0.9)), 0.0);
    }

    #[test]
    fn content_without_lessons_uses_course_level_progress() {
        assert_eq!(aggregate_progress(0.0, 0, Some(0.4)), 0.4);
        assert_eq!(aggregate_progress(0.0, 0, None), 0.0);
    }

    #[test]
    fn status_moves_forward_with_activity() {
        assert_eq!(
            next_status(EnrollmentStatus::Enrolled, 0.1),
            EnrollmentStatus::InProgress
        );
        assert_eq!(
            next_status(EnrollmentStatus::InProgress, 1.0),
            EnrollmentStatus::Completed
        );
        assert_eq!(
            next_status(EnrollmentStatus::Completed, 0.8),
            EnrollmentStatus::Completed
        );
        assert_eq!(
            next_status(EnrollmentStatus::Enrolled, 0.0),
            EnrollmentStatus::InProgress
        );
    }
}
