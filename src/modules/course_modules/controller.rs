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
    CourseModule, ModuleFilterParams, PaginatedModulesResponse, ReorderModulesDto,
    UpdateModuleDto,
};
use super::service::ModuleService;

/// List modules of the courses visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/modules",
    params(ModuleFilterParams),
    responses(
        (status = 200, description = "Paginated modules", body = PaginatedModulesResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_modules(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<ModuleFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedModulesResponse>, AppError> {
    let filters = query_params(filters)?;
    let modules = ModuleService::list_modules(&state.db, &auth_user, filters).await?;
    Ok(Json(modules))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Module", body = CourseModule),
        (status = 403, description = "No access to this course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseModule>, AppError> {
    let module = ModuleService::get_module(&state.db, &auth_user, id).await?;
    Ok(Json(module))
}

#[utoipa::path(
    put,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleDto,
    responses(
        (status = 200, description = "Module updated", body = CourseModule),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateModuleDto>,
) -> Result<Json<CourseModule>, AppError> {
    let module = ModuleService::update_module(&state.db, &auth_user, id, dto).await?;
    Ok(Json(module))
}

/// Delete a module and its lessons
#[utoipa::path(
    delete,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 204, description = "Module deleted"),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ModuleService::delete_module(&state.db, &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the order of every module in a content
#[utoipa::path(
    put,
    path = "/api/v1/modules/reorder",
    request_body = ReorderModulesDto,
    responses(
        (status = 200, description = "Modules in their new order", body = Vec<CourseModule>),
        (status = 400, description = "Ids do not match the content's modules", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto), fields(content.id = %dto.content_id))]
pub async fn reorder_modules(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ReorderModulesDto>,
) -> Result<Json<Vec<CourseModule>>, AppError> {
    let modules = ModuleService::reorder_modules(&state.db, &auth_user, dto).await?;
    Ok(Json(modules))
}
