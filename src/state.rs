use sqlx::PgPool;
use std::time::Instant;

use supernova_cache::{CacheConfig, RedisCache};
use supernova_config::{CorsConfig, EmailConfig, JwtConfig, RateLimitConfig};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub cache: Option<RedisCache>,
    pub started_at: Instant,
}

impl AppState {
    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let jwt_config = JwtConfig::from_env()?;
    let db = supernova_db::init_db_pool().await?;
    let cache = RedisCache::connect(&CacheConfig::from_env()).await;

    Ok(AppState {
        db,
        jwt_config,
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        cache,
        started_at: Instant::now(),
    })
}
