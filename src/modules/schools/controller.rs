use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use supernova_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireSuperAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::email::EmailService;
use crate::validator::{ValidatedJson, query_params};

use super::model::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolWithStats,
    UpdateSchoolDto,
};
use super::service::SchoolService;

/// Create a school together with its first school admin
#[utoipa::path(
    post,
    path = "/api/v1/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Admin email already registered", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 409, description = "School code or domain already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(school.code = %dto.code))]
pub async fn create_school(
    State(state): State<AppState>,
    RequireSuperAdmin(_auth_user): RequireSuperAdmin,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let admin_email = dto.admin.email.clone();
    let admin_name = format!("{} {}", dto.admin.first_name, dto.admin.last_name);

    let school = SchoolService::create_school(&state.db, dto).await?;

    EmailService::new(state.email_config.clone())
        .notify_school_created(&admin_email, &admin_name, &school.name)
        .await;

    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools",
    params(SchoolFilterParams),
    responses(
        (status = 200, description = "Paginated schools", body = PaginatedSchoolsResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_schools(
    State(state): State<AppState>,
    RequireSuperAdmin(_auth_user): RequireSuperAdmin,
    filters: Result<Query<SchoolFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedSchoolsResponse>, AppError> {
    let filters = query_params(filters)?;
    let schools = SchoolService::list_schools(&state.db, filters).await?;
    Ok(Json(schools))
}

/// The caller's own school with membership statistics
#[utoipa::path(
    get,
    path = "/api/v1/schools/me",
    responses(
        (status = 200, description = "Caller's school", body = SchoolWithStats),
        (status = 404, description = "Caller has no school", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<SchoolWithStats>, AppError> {
    let school = SchoolService::get_my_school(&state.db, state.cache(), &auth_user).await?;
    Ok(Json(school))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 200, description = "School with statistics", body = SchoolWithStats),
        (status = 403, description = "Not a member of this school", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SchoolWithStats>, AppError> {
    let school = SchoolService::get_school(&state.db, state.cache(), &auth_user, id).await?;
    Ok(Json(school))
}

/// Update a school
///
/// School admins may edit their own school but not its subscription or
/// capacity settings.
#[utoipa::path(
    put,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse),
        (status = 409, description = "Domain already exists", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<School>, AppError> {
    let school = SchoolService::update_school(&state.db, state.cache(), &auth_user, id, dto).await?;
    Ok(Json(school))
}

/// Deactivate a school (soft delete)
#[utoipa::path(
    delete,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 204, description = "School deactivated"),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_school(
    State(state): State<AppState>,
    RequireSuperAdmin(_auth_user): RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    SchoolService::delete_school(&state.db, state.cache(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
