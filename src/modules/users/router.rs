use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{create_user, delete_user, get_me, get_user, list_users, update_me, update_user};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).put(update_me))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}
