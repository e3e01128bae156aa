use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use supernova_config::CorsConfig;
use supernova_observability::{logging_middleware, metrics_middleware};

use crate::docs::ApiDoc;
use crate::modules::admin::init_admin_router;
use crate::modules::auth::init_auth_router;
use crate::modules::course_modules::init_modules_router;
use crate::modules::courses::init_courses_router;
use crate::modules::enrollments::init_enrollments_router;
use crate::modules::lessons::init_lessons_router;
use crate::modules::purchases::init_purchases_router;
use crate::modules::reviews::init_reviews_router;
use crate::modules::schools::init_schools_router;
use crate::modules::users::init_users_router;
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Origins that are valid header values; anything else is dropped.
fn allowed_origins(config: &CorsConfig) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect()
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(config))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Builds the full application. The server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the rate limiter
/// can fall back to the peer address.
pub fn init_router(state: AppState) -> Router {
    let general_limits = Arc::new(state.rate_limit_config.general_governor_config());
    let auth_limits = Arc::new(state.rate_limit_config.auth_governor_config());

    let api = Router::new()
        .nest(
            "/auth",
            init_auth_router().layer(GovernorLayer::new(auth_limits)),
        )
        .nest("/users", init_users_router())
        .nest("/schools", init_schools_router())
        .nest("/courses", init_courses_router())
        .nest("/modules", init_modules_router())
        .nest("/lessons", init_lessons_router())
        .nest("/enrollments", init_enrollments_router())
        .nest("/purchases", init_purchases_router())
        .nest("/reviews", init_reviews_router())
        .nest("/admin", init_admin_router())
        .layer(GovernorLayer::new(general_limits));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state.clone())
        .layer(cors_layer(&state.cors_config))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_origins_are_skipped() {
        let config = CorsConfig::from_list("http://localhost:5173, not a header\u{7f}");
        assert_eq!(config.allowed_origins.len(), 2);

        let origins = allowed_origins(&config);
        assert_eq!(origins, vec![HeaderValue::from_static("http://localhost:5173")]);
    }
}
