//! # Supernova Config
//!
//! One struct per concern, each built from environment variables with
//! `from_env()`:
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`cors`]: allowed browser origins
//! - [`email`]: SMTP delivery
//! - [`rate_limit`]: request budgets for the API and the auth endpoints
//!
//! ```ignore
//! use supernova_config::{CorsConfig, EmailConfig, JwtConfig, RateLimitConfig};
//!
//! dotenvy::dotenv().ok();
//! let jwt = JwtConfig::from_env()?;
//! let limits = RateLimitConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod rate_limit;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Reads `key` and parses it, falling back to `default` when the variable is
/// missing or malformed.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
