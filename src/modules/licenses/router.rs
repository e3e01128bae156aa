use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    check_license, create_license, get_license, list_course_licenses, list_school_licenses,
    update_license,
};

/// Mounted under `/purchases/licenses`.
pub fn init_licenses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_license))
        .route("/course/{id}", get(list_course_licenses))
        .route("/school/{id}", get(list_school_licenses))
        .route("/check/{course_id}/{school_id}", get(check_license))
        .route("/{id}", get(get_license).patch(update_license))
}
