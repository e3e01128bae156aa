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
use crate::modules::users::model::{CreateUserDto, PaginatedUsersResponse, User, UserFilterParams};
use crate::state::AppState;
use crate::validator::{ValidatedJson, query_params};

use super::model::{ContentStats, PlatformStats, SystemHealth};
use super::service::AdminService;

/// Platform-wide totals
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Platform statistics", body = PlatformStats),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn platform_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<PlatformStats>, AppError> {
    let stats = AdminService::platform_stats(&state.db, &auth_user).await?;
    Ok(Json(stats))
}

/// Database and cache reachability, uptime and version
#[utoipa::path(
    get,
    path = "/api/v1/admin/health",
    responses(
        (status = 200, description = "System health", body = SystemHealth),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn system_health(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<SystemHealth>, AppError> {
    let health =
        AdminService::system_health(&state.db, state.cache(), &auth_user, state.started_at)
            .await?;
    Ok(Json(health))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "All users", body = PaginatedUsersResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<UserFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let filters = query_params(filters)?;
    let users = AdminService::list_users(&state.db, &auth_user, filters).await?;
    Ok(Json(users))
}

/// Create a super admin or school admin account
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "Admin user created", body = User),
        (status = 400, description = "Not an admin role or email taken", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_admin_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = AdminService::create_admin_user(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/suspend",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User suspended", body = User),
        (status = 400, description = "Cannot suspend own account", body = ErrorResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn suspend_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = AdminService::suspend_user(&state.db, &auth_user, id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/reinstate",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User reinstated", body = User),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reinstate_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = AdminService::reinstate_user(&state.db, &auth_user, id).await?;
    Ok(Json(user))
}

/// Catalog counts, scoped to licensed courses for school admins
#[utoipa::path(
    get,
    path = "/api/v1/admin/content/stats",
    responses(
        (status = 200, description = "Content statistics", body = ContentStats),
        (status = 403, description = "Super admin or school admin only", body = ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn content_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ContentStats>, AppError> {
    let stats = AdminService::content_stats(&state.db, &auth_user).await?;
    Ok(Json(stats))
}
