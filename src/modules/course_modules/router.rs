use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{delete_module, get_module, list_modules, reorder_modules, update_module};

pub fn init_modules_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules))
        .route("/reorder", put(reorder_modules))
        .route(
            "/{id}",
            get(get_module).put(update_module).delete(delete_module),
        )
}
