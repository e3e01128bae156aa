//! # Supernova Cache
//!
//! Optional Redis cache for hot read paths.
//!
//! The cache is a read-through accelerator only: a failed read is a miss and
//! a failed write or invalidation is logged. Services hold it as
//! `Option<&RedisCache>` so the whole layer disappears when `REDIS_URL` is
//! unset.
//!
//! ```ignore
//! use supernova_cache::{CacheConfig, RedisCache, keys};
//!
//! let cache = RedisCache::connect(&CacheConfig::from_env()).await;
//! if let Some(cache) = &cache {
//!     cache.set(&keys::courses::by_id(course.id), &course).await?;
//! }
//! ```

pub mod config;
pub mod keys;
pub mod redis;

pub use config::CacheConfig;
pub use keys::invalidate;
pub use redis::{CacheError, RedisCache};
