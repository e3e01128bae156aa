use std::env;

use crate::ConfigError;

/// Access tokens live 30 minutes unless `JWT_ACCESS_EXPIRY` says otherwise.
pub const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 30 * 60;
/// Refresh tokens live 7 days unless `JWT_REFRESH_EXPIRY` says otherwise.
pub const DEFAULT_REFRESH_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    /// Reads the signing secret and token lifetimes.
    ///
    /// `JWT_SECRET` has no default: a missing or blank secret is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = Self::require_secret(env::var("JWT_SECRET").ok())?;

        Ok(Self {
            secret,
            access_token_expiry: crate::env_or("JWT_ACCESS_EXPIRY", DEFAULT_ACCESS_EXPIRY_SECS),
            refresh_token_expiry: crate::env_or(
                "JWT_REFRESH_EXPIRY",
                DEFAULT_REFRESH_EXPIRY_SECS,
            ),
        })
    }

    /// Default lifetimes with an explicit secret, for tests and tooling.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: DEFAULT_ACCESS_EXPIRY_SECS,
            refresh_token_expiry: DEFAULT_REFRESH_EXPIRY_SECS,
        }
    }

    fn require_secret(value: Option<String>) -> Result<String, ConfigError> {
        match value {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(ConfigError::Missing("JWT_SECRET")),
        }
    }
}
