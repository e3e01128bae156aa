use std::env;
use std::time::Duration;

/// | Variable | Default |
/// |----------|---------|
/// | `REDIS_URL` | unset (cache disabled) |
/// | `CACHE_TTL_SECONDS` | `300` |
/// | `CACHE_PREFIX` | `supernova` |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub default_ttl_seconds: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or_else(|_| "supernova".into()),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl_seconds: 300,
            key_prefix: "supernova".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_the_prefix() {
        let config = CacheConfig {
            key_prefix: "lms".into(),
            ..Default::default()
        };
        assert_eq!(config.prefixed_key("course:1"), "lms:course:1");
    }

    #[test]
    fn disabled_by_default() {
        let config = CacheConfig::default();
        assert!(config.redis_url.is_none());
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
    }
}
