use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use supernova_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireSchoolStaff;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::{ValidatedJson, query_params};

use super::model::{
    EnrollIndividualDto, EnrollStudentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentProgress, PaginatedEnrollmentsResponse, ProgressUpdateResponse,
    UpdateEnrollmentStatusDto, UpdateProgressDto,
};
use super::service::EnrollmentService;

/// Enroll a student of the caller's school (B2B)
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/student",
    request_body = EnrollStudentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "No license, seat limit reached, no active version or already enrolled", body = ErrorResponse),
        (status = 403, description = "School admins and teachers only", body = ErrorResponse),
        (status = 404, description = "Course or student not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(course.id = %dto.course_id, student.id = %dto.student_id))]
pub async fn enroll_student(
    State(state): State<AppState>,
    RequireSchoolStaff(auth_user): RequireSchoolStaff,
    ValidatedJson(dto): ValidatedJson<EnrollStudentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::enroll_student(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Self-enroll in a published D2C course
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/individual",
    request_body = EnrollIndividualDto,
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 400, description = "Not available, not purchased or already enrolled", body = ErrorResponse),
        (status = 403, description = "Individual users only", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(course.id = %dto.course_id))]
pub async fn enroll_individual(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<EnrollIndividualDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::enroll_individual(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    params(EnrollmentFilterParams),
    responses(
        (status = 200, description = "Paginated enrollments in the caller's scope", body = PaginatedEnrollmentsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<EnrollmentFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedEnrollmentsResponse>, AppError> {
    let filters = query_params(filters)?;
    let enrollments = EnrollmentService::list_enrollments(&state.db, &auth_user, filters).await?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    put,
    path = "/api/v1/enrollments/{id}/status",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentStatusDto,
    responses(
        (status = 200, description = "Status updated", body = Enrollment),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_enrollment_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateEnrollmentStatusDto>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = EnrollmentService::update_status(&state.db, &auth_user, id, dto).await?;
    Ok(Json(enrollment))
}

/// Record progress on a course, module or lesson
///
/// Time spent accumulates across calls. The enrollment's aggregate progress
/// is the mean of its lesson progress.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/progress",
    request_body = UpdateProgressDto,
    responses(
        (status = 200, description = "Progress recorded", body = ProgressUpdateResponse),
        (status = 400, description = "Enrollment not active or content outside the enrolled version", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 422, description = "Progress out of range", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_progress(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdateProgressDto>,
) -> Result<Json<ProgressUpdateResponse>, AppError> {
    let result = EnrollmentService::update_progress(&state.db, &auth_user, dto).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{id}/progress",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment with its progress rows", body = EnrollmentProgress),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_progress(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentProgress>, AppError> {
    let progress = EnrollmentService::get_progress(&state.db, &auth_user, id).await?;
    Ok(Json(progress))
}
