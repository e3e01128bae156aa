use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    content_stats, create_admin_user, list_users, platform_stats, reinstate_user, suspend_user,
    system_health,
};

pub fn init_admin_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(platform_stats))
        .route("/health", get(system_health))
        .route("/users", get(list_users).post(create_admin_user))
        .route("/users/{id}/suspend", post(suspend_user))
        .route("/users/{id}/reinstate", post(reinstate_user))
        .route("/content/stats", get(content_stats))
}
