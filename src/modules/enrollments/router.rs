use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    enroll_individual, enroll_student, get_enrollment_progress, list_enrollments,
    update_enrollment_status, update_progress,
};

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments))
        .route("/student", post(enroll_student))
        .route("/individual", post(enroll_individual))
        .route("/progress", post(update_progress))
        .route("/{id}/status", put(update_enrollment_status))
        .route("/{id}/progress", get(get_enrollment_progress))
}
