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
    CreatePurchaseDto, PaginatedPurchasesResponse, Purchase, PurchaseFilterParams,
    PurchaseSummary, UpdatePurchaseDto,
};
use super::service::PurchaseService;

/// Record a D2C course purchase
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = CreatePurchaseDto,
    responses(
        (status = 201, description = "Purchase recorded", body = Purchase),
        (status = 400, description = "Course not purchasable or active purchase exists", body = ErrorResponse),
        (status = 403, description = "Purchasing for another user", body = ErrorResponse),
        (status = 404, description = "Course or user not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_purchase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreatePurchaseDto>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    let purchase = PurchaseService::create_purchase(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/{id}",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Purchase", body = Purchase),
        (status = 403, description = "Not the buyer", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_purchase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Purchase>, AppError> {
    let purchase = PurchaseService::get_purchase(&state.db, &auth_user, id).await?;
    Ok(Json(purchase))
}

/// Update payment status, validity or transaction reference
#[utoipa::path(
    patch,
    path = "/api/v1/purchases/{id}",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    request_body = UpdatePurchaseDto,
    responses(
        (status = 200, description = "Purchase updated", body = Purchase),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Purchase not found", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_purchase(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdatePurchaseDto>,
) -> Result<Json<Purchase>, AppError> {
    let purchase = PurchaseService::update_purchase(&state.db, &auth_user, id, dto).await?;
    Ok(Json(purchase))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID"), PurchaseFilterParams),
    responses(
        (status = 200, description = "Purchases of the course, newest first", body = PaginatedPurchasesResponse),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_course_purchases(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<PurchaseFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedPurchasesResponse>, AppError> {
    let filters = query_params(filters)?;
    let purchases =
        PurchaseService::list_course_purchases(&state.db, &auth_user, id, filters).await?;
    Ok(Json(purchases))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/user/{id}",
    params(("id" = Uuid, Path, description = "User ID"), PurchaseFilterParams),
    responses(
        (status = 200, description = "Purchases of the user, newest first", body = PaginatedPurchasesResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_user_purchases(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<PurchaseFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedPurchasesResponse>, AppError> {
    let filters = query_params(filters)?;
    let purchases =
        PurchaseService::list_user_purchases(&state.db, &auth_user, id, filters).await?;
    Ok(Json(purchases))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/summary/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Purchase summary", body = PurchaseSummary),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Purchases",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn purchase_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PurchaseSummary>, AppError> {
    let summary = PurchaseService::purchase_summary(&state.db, &auth_user, user_id).await?;
    Ok(Json(summary))
}
