//! Request budgets enforced with `tower_governor`.
//!
//! Two token buckets are configured per client IP:
//!
//! - the general bucket covers every `/api/v1` route
//! - the auth bucket covers `/api/v1/auth/*` and is much smaller
//!
//! `*_per_second` is the replenish interval: one token returns to the bucket
//! every N seconds. `*_burst_size` is the bucket capacity.
//!
//! The client IP comes from `x-forwarded-for`, `x-real-ip` or `forwarded`,
//! falling back to the socket peer address (the server is started with
//! connect info).
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RATE_LIMIT_GENERAL_PER_SECOND` | 1 |
//! | `RATE_LIMIT_GENERAL_BURST_SIZE` | 100 |
//! | `RATE_LIMIT_AUTH_PER_SECOND` | 10 |
//! | `RATE_LIMIT_AUTH_BURST_SIZE` | 5 |

use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

pub type IpGovernorConfig =
    GovernorConfig<SmartIpKeyExtractor, ::governor::middleware::NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub general_per_second: u64,
    pub general_burst_size: u32,
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_per_second: 1,
            general_burst_size: 100,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            general_per_second: crate::env_or(
                "RATE_LIMIT_GENERAL_PER_SECOND",
                defaults.general_per_second,
            ),
            general_burst_size: crate::env_or(
                "RATE_LIMIT_GENERAL_BURST_SIZE",
                defaults.general_burst_size,
            ),
            auth_per_second: crate::env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: crate::env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    /// Budgets large enough that tests never trip them.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            general_per_second: 1,
            general_burst_size: 10_000,
            auth_per_second: 1,
            auth_burst_size: 10_000,
        }
    }

    /// # Panics
    ///
    /// Panics if the interval or burst size is zero.
    #[must_use]
    pub fn general_governor_config(&self) -> IpGovernorConfig {
        build(self.general_per_second, self.general_burst_size)
            .expect("Failed to build general rate limiter config")
    }

    /// # Panics
    ///
    /// Panics if the interval or burst size is zero.
    #[must_use]
    pub fn auth_governor_config(&self) -> IpGovernorConfig {
        build(self.auth_per_second, self.auth_burst_size)
            .expect("Failed to build auth rate limiter config")
    }
}

fn build(per_second: u64, burst_size: u32) -> Option<IpGovernorConfig> {
    GovernorConfigBuilder::default()
        .per_second(per_second.max(1))
        .burst_size(burst_size.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_auth_tighter_than_general() {
        let config = RateLimitConfig::default();
        assert!(config.auth_burst_size < config.general_burst_size);
        assert!(config.auth_per_second > config.general_per_second);
    }

    #[test]
    fn governor_configs_build_from_defaults() {
        let config = RateLimitConfig::default();
        let _ = config.general_governor_config();
        let _ = config.auth_governor_config();
    }

    #[test]
    fn zero_values_are_raised_to_one() {
        assert!(build(0, 0).is_some());
    }
}
