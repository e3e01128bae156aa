//! Redis client with JSON values and prefixed keys.

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CacheConfig;

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
    prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RedisCache {
    pub async fn new(
        redis_url: &str,
        default_ttl: Duration,
        prefix: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            default_ttl,
            prefix: prefix.into(),
        })
    }

    /// Connects when `REDIS_URL` is configured. A connection failure is
    /// logged and leaves the application running without a cache.
    pub async fn connect(config: &CacheConfig) -> Option<Self> {
        let url = config.redis_url.as_deref()?;
        match Self::new(url, config.default_ttl(), config.key_prefix.clone()).await {
            Ok(cache) => {
                info!(cache.prefix = %config.key_prefix, "Redis cache connected");
                Some(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, continuing without cache");
                None
            }
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    #[instrument(skip(self), fields(cache.operation = "GET"))]
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(parsed) => {
                    debug!(cache.key = %full_key, "Cache hit");
                    Some(parsed)
                }
                Err(e) => {
                    error!(cache.key = %full_key, error = %e, "Failed to deserialize cached value");
                    None
                }
            },
            Ok(None) => {
                debug!(cache.key = %full_key, "Cache miss");
                None
            }
            Err(e) => {
                error!(cache.key = %full_key, error = %e, "Redis GET error");
                None
            }
        }
    }

    #[instrument(skip(self, value), fields(cache.operation = "SET"))]
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    #[instrument(skip(self, value), fields(cache.operation = "SETEX"))]
    pub async fn set_with_ttl<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);
        let json = serde_json::to_string(value)?;

        conn.set_ex::<_, _, ()>(&full_key, json, ttl.as_secs().max(1))
            .await?;

        debug!(cache.key = %full_key, cache.ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }

    /// Stores a value, logging instead of failing.
    pub async fn store<T>(&self, key: &str, value: &T)
    where
        T: Serialize,
    {
        if let Err(e) = self.set(key, value).await {
            warn!(cache.key = %key, error = %e, "Failed to cache value");
        }
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let full_key = self.key(key);

        conn.del::<_, ()>(&full_key).await?;

        debug!(cache.key = %full_key, "Cache invalidated");
        Ok(())
    }

    /// Round trip used by the admin health check.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: i32,
        name: String,
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn set_get_and_invalidate() {
        let cache = RedisCache::new(
            "redis://localhost:6379",
            Duration::from_secs(60),
            "supernova-test",
        )
        .await
        .unwrap();

        let sample = Sample {
            id: 1,
            name: "sample".to_string(),
        };
        cache.set("sample:1", &sample).await.unwrap();
        assert_eq!(cache.get::<Sample>("sample:1").await, Some(sample));

        cache.invalidate("sample:1").await.unwrap();
        assert_eq!(cache.get::<Sample>("sample:1").await, None);
    }
}
