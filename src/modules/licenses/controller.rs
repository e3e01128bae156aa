use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use supernova_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::{ValidatedJson, query_params};

use super::model::{
    CreateLicenseDto, License, LicenseCheckResponse, LicenseFilterParams,
    PaginatedLicensesResponse, UpdateLicenseDto,
};
use super::service::LicenseService;

/// Grant a school a license for a B2B course
#[utoipa::path(
    post,
    path = "/api/v1/purchases/licenses",
    request_body = CreateLicenseDto,
    responses(
        (status = 201, description = "License granted", body = License),
        (status = 400, description = "Course not B2B enabled or invalid window", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Course or school not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_license(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateLicenseDto>,
) -> Result<(StatusCode, Json<License>), AppError> {
    let license = LicenseService::create_license(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(license)))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/licenses/{id}",
    params(("id" = Uuid, Path, description = "License ID")),
    responses(
        (status = 200, description = "License", body = License),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "License not found", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_license(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<License>, AppError> {
    let license = LicenseService::get_license(&state.db, &auth_user, id).await?;
    Ok(Json(license))
}

#[utoipa::path(
    patch,
    path = "/api/v1/purchases/licenses/{id}",
    params(("id" = Uuid, Path, description = "License ID")),
    request_body = UpdateLicenseDto,
    responses(
        (status = 200, description = "License updated", body = License),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "License not found", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_license(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateLicenseDto>,
) -> Result<Json<License>, AppError> {
    let license = LicenseService::update_license(&state.db, &auth_user, id, dto).await?;
    Ok(Json(license))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/licenses/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID"), LicenseFilterParams),
    responses(
        (status = 200, description = "Licenses of the course", body = PaginatedLicensesResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_course_licenses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<LicenseFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedLicensesResponse>, AppError> {
    let filters = query_params(filters)?;
    let licenses = LicenseService::list_course_licenses(&state.db, &auth_user, id, filters).await?;
    Ok(Json(licenses))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/licenses/school/{id}",
    params(("id" = Uuid, Path, description = "School ID"), LicenseFilterParams),
    responses(
        (status = 200, description = "Licenses held by the school", body = PaginatedLicensesResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_school_licenses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<LicenseFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedLicensesResponse>, AppError> {
    let filters = query_params(filters)?;
    let licenses = LicenseService::list_school_licenses(&state.db, &auth_user, id, filters).await?;
    Ok(Json(licenses))
}

/// Check whether a school may enroll students in a course
#[utoipa::path(
    get,
    path = "/api/v1/purchases/licenses/check/{course_id}/{school_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("school_id" = Uuid, Path, description = "School ID")
    ),
    responses(
        (status = 200, description = "License status and seat usage", body = LicenseCheckResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Licenses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn check_license(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, school_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LicenseCheckResponse>, AppError> {
    let check = LicenseService::check_license(&state.db, &auth_user, course_id, school_id).await?;
    Ok(Json(check))
}
