//! Supernova observability.
//!
//! - Tracing to the console, daily rolling log files and an OTLP collector
//! - Prometheus metrics for HTTP traffic and domain events
//! - Per-request logging middleware
//!
//! The heavy parts compile only with the `observability` feature (on by
//! default). At runtime `OBSERVABILITY_ENABLED=false` falls back to plain
//! console logging and turns every metric helper into a no-op.
//!
//! ```no_run
//! use supernova_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     // ... application code ...
//!     shutdown_tracer().await;
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;
pub mod middleware;

use std::sync::OnceLock;

pub use basic_logging::init_basic_console_logging;
pub use middleware::logging_middleware;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, shutdown_tracer};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_app, metrics_middleware, track_course_created,
    track_enrollment_created, track_jwt_issued, track_purchase_created, track_review_created,
    track_school_created, track_user_created, track_user_login_failure, track_user_login_success,
};
#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// `OBSERVABILITY_ENABLED` (default true). Always false without the feature.
pub fn is_observability_enabled() -> bool {
    if !cfg!(feature = "observability") {
        return false;
    }
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true)
    })
}

// No-op stand-ins when the feature is compiled out
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{Router, extract::Request, middleware::Next, response::Response};

    /// Placeholder for the Prometheus handle; never constructed.
    #[derive(Clone, Debug)]
    pub struct PrometheusHandle;

    pub fn init_tracing() {
        crate::init_basic_console_logging();
    }

    pub async fn shutdown_tracer() {}

    pub fn init_metrics() -> Option<PrometheusHandle> {
        None
    }

    pub fn metrics_app(_handle: PrometheusHandle) -> Router {
        Router::new()
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub fn track_user_created(_role: &str) {}
    pub fn track_user_login_success(_role: &str) {}
    pub fn track_user_login_failure(_reason: &str) {}
    pub fn track_jwt_issued() {}
    pub fn track_school_created() {}
    pub fn track_course_created() {}
    pub fn track_enrollment_created(_enrollment_type: &str) {}
    pub fn track_purchase_created(_payment_status: &str) {}
    pub fn track_review_created(_rating: i32) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
