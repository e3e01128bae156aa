use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_review, delete_review, get_enrollment_review, get_review, list_course_reviews,
    list_user_reviews, moderate_review, review_stats, update_review,
};

pub fn init_reviews_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/course/{id}", get(list_course_reviews))
        .route("/user/{id}", get(list_user_reviews))
        .route("/enrollment/{id}", get(get_enrollment_review))
        .route("/stats/{course_id}", get(review_stats))
        .route(
            "/{id}",
            get(get_review).patch(update_review).delete(delete_review),
        )
        .route("/{id}/moderate", post(moderate_review))
}
