use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use supernova_core::AppError;
use supernova_models::content::{CourseModule, CreateLessonDto, CreateModuleDto, Lesson};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::course_modules::service::ModuleService;
use crate::modules::lessons::service::LessonService;
use crate::state::AppState;
use crate::validator::{ValidatedJson, query_params};

use super::model::{
    Course, CourseContent, CourseDetail, CourseFilterParams, CourseVersion, CourseVersionDetail,
    CreateCourseDto, CreateVersionDto, PaginatedCoursesResponse, UpdateContentDto,
    UpdateCourseDto,
};
use super::service::CourseService;

/// Create a course in draft status
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 409, description = "Course code already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(course.code = %dto.code))]
pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::create_course(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// List the courses visible to the caller
///
/// Schools see licensed courses, individual users see published D2C courses
/// and their enrollments, super admins see everything.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CourseFilterParams),
    responses(
        (status = 200, description = "Paginated courses", body = PaginatedCoursesResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<CourseFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedCoursesResponse>, AppError> {
    let filters = query_params(filters)?;
    let courses = CourseService::list_courses(&state.db, &auth_user, filters).await?;
    Ok(Json(courses))
}

/// A course with its current version and content tree
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course detail", body = CourseDetail),
        (status = 403, description = "No access to this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseDetail>, AppError> {
    let course = CourseService::get_course(&state.db, state.cache(), &auth_user, id).await?;
    Ok(Json(course))
}

/// Update a course
///
/// Status changes follow draft → published → archived → draft. Publishing
/// requires a description, D2C pricing when D2C is enabled, and a current
/// version.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid transition or not publishable", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Course code already exists", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::update_course(&state.db, state.cache(), &auth_user, id, dto).await?;
    Ok(Json(course))
}

/// Soft delete a course
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CourseService::delete_course(&state.db, state.cache(), &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a new current version with fresh content
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/versions",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateVersionDto,
    responses(
        (status = 201, description = "Version created", body = CourseVersionDetail),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Version label already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(version = %dto.version))]
pub async fn create_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateVersionDto>,
) -> Result<(StatusCode, Json<CourseVersionDetail>), AppError> {
    let version = CourseService::create_version(&state.db, &auth_user, id, dto).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/versions",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Versions, newest first", body = Vec<CourseVersion>),
        (status = 403, description = "No access to this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_versions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CourseVersion>>, AppError> {
    let versions = CourseService::list_versions(&state.db, state.cache(), &auth_user, id).await?;
    Ok(Json(versions))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/content/{content_id}",
    params(("content_id" = Uuid, Path, description = "Content ID")),
    request_body = UpdateContentDto,
    responses(
        (status = 200, description = "Content updated", body = CourseContent),
        (status = 400, description = "end_date before start_date", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_content(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(content_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateContentDto>,
) -> Result<Json<CourseContent>, AppError> {
    let content = CourseService::update_content(&state.db, &auth_user, content_id, dto).await?;
    Ok(Json(content))
}

/// Add a module to a content
#[utoipa::path(
    post,
    path = "/api/v1/courses/content/{content_id}/modules",
    params(("content_id" = Uuid, Path, description = "Content ID")),
    request_body = CreateModuleDto,
    responses(
        (status = 201, description = "Module created", body = CourseModule),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn add_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(content_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateModuleDto>,
) -> Result<(StatusCode, Json<CourseModule>), AppError> {
    let module = ModuleService::add_module(&state.db, &auth_user, content_id, dto).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// Add a lesson to a module
#[utoipa::path(
    post,
    path = "/api/v1/courses/modules/{module_id}/lessons",
    params(("module_id" = Uuid, Path, description = "Module ID")),
    request_body = CreateLessonDto,
    responses(
        (status = 201, description = "Lesson created", body = Lesson),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn add_lesson(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(module_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateLessonDto>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = LessonService::add_lesson(&state.db, &auth_user, module_id, dto).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}
