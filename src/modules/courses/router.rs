use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    add_lesson, add_module, create_course, create_version, delete_course, get_course,
    list_courses, list_versions, update_content, update_course,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/content/{content_id}", put(update_content))
        .route("/content/{content_id}/modules", post(add_module))
        .route("/modules/{module_id}/lessons", post(add_lesson))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/{id}/versions", get(list_versions).post(create_version))
}
