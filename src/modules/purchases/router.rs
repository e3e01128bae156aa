use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::licenses::init_licenses_router;
use crate::state::AppState;

use super::controller::{
    create_purchase, get_purchase, list_course_purchases, list_user_purchases, purchase_summary,
    update_purchase,
};

pub fn init_purchases_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase))
        .route("/course/{id}", get(list_course_purchases))
        .route("/user/{id}", get(list_user_purchases))
        .route("/summary/{user_id}", get(purchase_summary))
        .route("/{id}", get(get_purchase).patch(update_purchase))
        .nest("/licenses", init_licenses_router())
}
