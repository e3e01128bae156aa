use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{delete_lesson, get_lesson, list_lessons, update_lesson};

pub fn init_lessons_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lessons))
        .route(
            "/{id}",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
}
