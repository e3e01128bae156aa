//! Cache keys, relative to the configured prefix, and invalidation helpers.

use tracing::warn;
use uuid::Uuid;

use crate::RedisCache;

fn build_key(parts: &[&str]) -> String {
    parts.join(":")
}

pub mod schools {
    use super::*;

    pub fn by_id(school_id: Uuid) -> String {
        build_key(&["school", &school_id.to_string()])
    }
}

pub mod courses {
    use super::*;

    pub fn by_id(course_id: Uuid) -> String {
        build_key(&["course", &course_id.to_string()])
    }
}

pub mod reviews {
    use super::*;

    pub fn stats(course_id: Uuid) -> String {
        build_key(&["course", &course_id.to_string(), "review_stats"])
    }
}

pub mod invalidate {
    use super::*;

    async fn drop_key(cache: &RedisCache, key: String) {
        if let Err(e) = cache.invalidate(&key).await {
            warn!(error = %e, cache.key = %key, "Failed to invalidate cache entry");
        }
    }

    pub async fn school(cache: Option<&RedisCache>, school_id: Uuid) {
        let Some(cache) = cache else { return };
        drop_key(cache, schools::by_id(school_id)).await;
    }

    /// Drops the course and everything cached under it.
    pub async fn course(cache: Option<&RedisCache>, course_id: Uuid) {
        let Some(cache) = cache else { return };
        drop_key(cache, courses::by_id(course_id)).await;
        drop_key(cache, reviews::stats(course_id)).await;
    }

    pub async fn review_stats(cache: Option<&RedisCache>, course_id: Uuid) {
        let Some(cache) = cache else { return };
        drop_key(cache, reviews::stats(course_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_entity() {
        let id = Uuid::nil();
        assert_eq!(
            schools::by_id(id),
            "school:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            reviews::stats(id),
            "course:00000000-0000-0000-0000-000000000000:review_stats"
        );
        assert_ne!(courses::by_id(id), reviews::stats(id));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn course_invalidation_drops_review_stats() {
        let cache = RedisCache::new(
            "redis://localhost:6379",
            std::time::Duration::from_secs(60),
            "supernova-test",
        )
        .await
        .unwrap();
        let course_id = Uuid::new_v4();

        cache.set(&courses::by_id(course_id), &"course").await.unwrap();
        cache.set(&reviews::stats(course_id), &"stats").await.unwrap();

        invalidate::course(Some(&cache), course_id).await;

        assert_eq!(cache.get::<String>(&courses::by_id(course_id)).await, None);
        assert_eq!(cache.get::<String>(&reviews::stats(course_id)).await, None);
    }
}
