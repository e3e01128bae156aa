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
    CreateReviewDto, ModerateReviewDto, PaginatedReviewsResponse, Review, ReviewFilterParams,
    ReviewStats, UpdateReviewDto,
};
use super::service::ReviewService;

/// Review a course through one of the caller's enrollments
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = CreateReviewDto,
    responses(
        (status = 201, description = "Review submitted for moderation", body = Review),
        (status = 400, description = "Enrollment already reviewed", body = ErrorResponse),
        (status = 403, description = "Not the caller's enrollment", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateReviewDto>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = ReviewService::create_review(&state.db, &auth_user, dto).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 403, description = "Review not visible to caller", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Review>, AppError> {
    let review = ReviewService::get_review(&state.db, &auth_user, id).await?;
    Ok(Json(review))
}

#[utoipa::path(
    patch,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewDto,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateReviewDto>,
) -> Result<Json<Review>, AppError> {
    let review =
        ReviewService::update_review(&state.db, state.cache(), &auth_user, id, dto).await?;
    Ok(Json(review))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ReviewService::delete_review(&state.db, state.cache(), &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve, reject, hide or feature a review
#[utoipa::path(
    post,
    path = "/api/v1/reviews/{id}/moderate",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = ModerateReviewDto,
    responses(
        (status = 200, description = "Review moderated", body = Review),
        (status = 403, description = "Super admin only", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn moderate_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<ModerateReviewDto>,
) -> Result<Json<Review>, AppError> {
    let review =
        ReviewService::moderate_review(&state.db, state.cache(), &auth_user, id, dto).await?;
    Ok(Json(review))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID"), ReviewFilterParams),
    responses(
        (status = 200, description = "Reviews of the course, featured first", body = PaginatedReviewsResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_course_reviews(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<ReviewFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedReviewsResponse>, AppError> {
    let filters = query_params(filters)?;
    let reviews = ReviewService::list_course_reviews(&state.db, &auth_user, id, filters).await?;
    Ok(Json(reviews))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/user/{id}",
    params(("id" = Uuid, Path, description = "User ID"), ReviewFilterParams),
    responses(
        (status = 200, description = "Reviews written by the user", body = PaginatedReviewsResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_user_reviews(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    filters: Result<Query<ReviewFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedReviewsResponse>, AppError> {
    let filters = query_params(filters)?;
    let reviews = ReviewService::list_user_reviews(&state.db, &auth_user, id, filters).await?;
    Ok(Json(reviews))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/enrollment/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Review left through the enrollment", body = Review),
        (status = 403, description = "Review not visible to caller", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Review>, AppError> {
    let review = ReviewService::get_enrollment_review(&state.db, &auth_user, id).await?;
    Ok(Json(review))
}

/// Rating aggregates over the approved reviews of a course
#[utoipa::path(
    get,
    path = "/api/v1/reviews/stats/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Review statistics", body = ReviewStats),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Reviews",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn review_stats(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ReviewStats>, AppError> {
    let stats = ReviewService::review_stats(&state.db, state.cache(), course_id).await?;
    Ok(Json(stats))
}
