use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_cache::{RedisCache, invalidate, keys};
use supernova_core::{AppError, PaginationMeta};
use supernova_db::{UNIQUE_VIOLATION, is_db_error};
use supernova_models::ReviewStatus;
use supernova_models::enrollments::Enrollment;
use supernova_observability::track_review_created;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{ensure_self_or_super_admin, ensure_super_admin};
use crate::modules::courses::service::CourseService;
use crate::modules::enrollments::service::ENROLLMENT_COLUMNS;

use super::model::{
    CreateReviewDto, ModerateReviewDto, PaginatedReviewsResponse, Review, ReviewFilterParams,
    ReviewStats, UpdateReviewDto,
};

const REVIEW_COLUMNS: &str = "id, enrollment_id, course_id, user_id, rating, review_text, pros, \
     cons, would_recommend, difficulty_rating, engagement_rating, is_featured, status, \
     moderated_by_id, moderated_at, moderation_comment, created_at, updated_at";

/// Approved reviews are public to authenticated callers.
fn can_view_review(auth_user: &AuthUser, review: &Review) -> bool {
    review.status == ReviewStatus::Approved
        || review.user_id == auth_user.user_id()
        || auth_user.is_super_admin()
}

/// Status filter for course listings: approved unless a super admin asks
/// for something else.
fn course_listing_status(auth_user: &AuthUser, requested: Option<ReviewStatus>) -> ReviewStatus {
    match requested {
        Some(status) if auth_user.is_super_admin() => status,
        _ => ReviewStatus::Approved,
    }
}

fn merge_review(mut review: Review, dto: UpdateReviewDto) -> Review {
    review.rating = dto.rating.unwrap_or(review.rating);
    review.review_text = dto.review_text.or(review.review_text);
    review.pros = dto.pros.unwrap_or(review.pros);
    review.cons = dto.cons.unwrap_or(review.cons);
    review.would_recommend = dto.would_recommend.or(review.would_recommend);
    review.difficulty_rating = dto.difficulty_rating.or(review.difficulty_rating);
    review.engagement_rating = dto.engagement_rating.or(review.engagement_rating);
    review.status = dto.status.unwrap_or(review.status);
    review
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total_reviews: i64,
    average_rating: Option<f64>,
    average_difficulty: Option<f64>,
    average_engagement: Option<f64>,
    recommendation_percentage: Option<f64>,
}

pub struct ReviewService;

impl ReviewService {
    async fn find_review(db: &PgPool, id: Uuid) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM course_reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Review not found")))
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_reviews", enrollment.id = %dto.enrollment_id))]
    pub async fn create_review(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreateReviewDto,
    ) -> Result<Review, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM course_enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.enrollment_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))?;

        if enrollment.learner_id() != Some(auth_user.user_id()) {
            return Err(AppError::forbidden("You can only review your own enrollments"));
        }

        let reviewed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM course_reviews WHERE enrollment_id = $1)",
        )
        .bind(enrollment.id)
        .fetch_one(db)
        .await?;
        if reviewed {
            return Err(AppError::bad_request(anyhow!("Enrollment already reviewed")));
        }

        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO course_reviews
                 (enrollment_id, course_id, user_id, rating, review_text, pros, cons,
                  would_recommend, difficulty_rating, engagement_rating, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
             RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(enrollment.id)
        .bind(enrollment.course_id)
        .bind(auth_user.user_id())
        .bind(dto.rating)
        .bind(&dto.review_text)
        .bind(&dto.pros)
        .bind(&dto.cons)
        .bind(dto.would_recommend)
        .bind(dto.difficulty_rating)
        .bind(dto.engagement_rating)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_db_error(&e, UNIQUE_VIOLATION) {
                return AppError::bad_request(anyhow!("Enrollment already reviewed"));
            }
            e.into()
        })?;

        track_review_created(review.rating);
        info!(review.id = %review.id, course.id = %review.course_id, "Review submitted");
        Ok(review)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_reviews"))]
    pub async fn get_review(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<Review, AppError> {
        let review = Self::find_review(db, id).await?;
        if !can_view_review(auth_user, &review) {
            return Err(AppError::forbidden("You don't have permission to view this review"));
        }
        Ok(review)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_reviews"))]
    pub async fn get_enrollment_review(
        db: &PgPool,
        auth_user: &AuthUser,
        enrollment_id: Uuid,
    ) -> Result<Review, AppError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM course_reviews WHERE enrollment_id = $1",
            REVIEW_COLUMNS
        ))
        .bind(enrollment_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Review not found")))?;

        if !can_view_review(auth_user, &review) {
            return Err(AppError::forbidden("You don't have permission to view this review"));
        }
        Ok(review)
    }

    #[instrument(skip(db, cache, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_reviews"))]
    pub async fn update_review(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateReviewDto,
    ) -> Result<Review, AppError> {
        let existing = Self::find_review(db, id).await?;
        ensure_self_or_super_admin(auth_user, existing.user_id)?;
        if dto.status.is_some() && !auth_user.is_super_admin() {
            return Err(AppError::forbidden("Only super admins can change review status"));
        }

        // A status change is a moderation decision
        let moderator = dto.status.is_some().then(|| auth_user.user_id());
        let review = merge_review(existing, dto);

        let updated = sqlx::query_as::<_, Review>(&format!(
            "UPDATE course_reviews
             SET rating = $1, review_text = $2, pros = $3, cons = $4, would_recommend = $5,
                 difficulty_rating = $6, engagement_rating = $7, status = $8,
                 moderated_by_id = COALESCE($10, moderated_by_id),
                 moderated_at = CASE WHEN $10::uuid IS NULL THEN moderated_at ELSE NOW() END,
                 updated_at = NOW()
             WHERE id = $9
             RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(review.rating)
        .bind(&review.review_text)
        .bind(&review.pros)
        .bind(&review.cons)
        .bind(review.would_recommend)
        .bind(review.difficulty_rating)
        .bind(review.engagement_rating)
        .bind(review.status)
        .bind(id)
        .bind(moderator)
        .fetch_one(db)
        .await?;

        invalidate::review_stats(cache, updated.course_id).await;
        Ok(updated)
    }

    #[instrument(skip(db, cache, auth_user), fields(db.operation = "DELETE", db.table = "course_reviews"))]
    pub async fn delete_review(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<(), AppError> {
        let review = Self::find_review(db, id).await?;
        ensure_self_or_super_admin(auth_user, review.user_id)?;

        sqlx::query("DELETE FROM course_reviews WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        invalidate::review_stats(cache, review.course_id).await;
        Ok(())
    }

    #[instrument(skip(db, cache, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_reviews"))]
    pub async fn moderate_review(
        db: &PgPool,
        cache: Option<&RedisCache>,
        auth_user: &AuthUser,
        id: Uuid,
        dto: ModerateReviewDto,
    ) -> Result<Review, AppError> {
        ensure_super_admin(auth_user)?;

        let existing = Self::find_review(db, id).await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE course_reviews
             SET status = $1, moderation_comment = $2, is_featured = $3,
                 moderated_by_id = $4, moderated_at = NOW(), updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(dto.status)
        .bind(dto.moderation_comment.or(existing.moderation_comment))
        .bind(dto.is_featured.unwrap_or(existing.is_featured))
        .bind(auth_user.user_id())
        .bind(id)
        .fetch_one(db)
        .await?;

        invalidate::review_stats(cache, review.course_id).await;
        info!(review.id = %review.id, review.status = ?review.status, "Review moderated");
        Ok(review)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_reviews"))]
    pub async fn list_course_reviews(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
        filters: ReviewFilterParams,
    ) -> Result<PaginatedReviewsResponse, AppError> {
        let status = course_listing_status(auth_user, filters.status);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM course_reviews WHERE course_id = $1 AND status = $2",
        )
        .bind(course_id)
        .bind(status)
        .fetch_one(db)
        .await?;

        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM course_reviews WHERE course_id = $1 AND status = $2
             ORDER BY is_featured DESC, created_at DESC
             LIMIT $3 OFFSET $4",
            REVIEW_COLUMNS
        ))
        .bind(course_id)
        .bind(status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedReviewsResponse {
            data: reviews,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_reviews"))]
    pub async fn list_user_reviews(
        db: &PgPool,
        auth_user: &AuthUser,
        user_id: Uuid,
        filters: ReviewFilterParams,
    ) -> Result<PaginatedReviewsResponse, AppError> {
        ensure_self_or_super_admin(auth_user, user_id)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM course_reviews
             WHERE user_id = $1 AND ($2::review_status IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM course_reviews
             WHERE user_id = $1 AND ($2::review_status IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
            REVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(filters.status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedReviewsResponse {
            data: reviews,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    /// Aggregates over the approved reviews of a course, served from the
    /// cache when possible.
    #[instrument(skip(db, cache), fields(db.operation = "SELECT", db.table = "course_reviews"))]
    pub async fn review_stats(
        db: &PgPool,
        cache: Option<&RedisCache>,
        course_id: Uuid,
    ) -> Result<ReviewStats, AppError> {
        CourseService::find_course(db, cache, course_id).await?;

        let key = keys::reviews::stats(course_id);
        if let Some(cache) = cache
            && let Some(stats) = cache.get::<ReviewStats>(&key).await
        {
            return Ok(stats);
        }

        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT COUNT(*) AS total_reviews,
                    AVG(rating)::float8 AS average_rating,
                    AVG(difficulty_rating)::float8 AS average_difficulty,
                    AVG(engagement_rating)::float8 AS average_engagement,
                    (100.0 * COUNT(*) FILTER (WHERE would_recommend)
                        / NULLIF(COUNT(would_recommend), 0))::float8 AS recommendation_percentage
             FROM course_reviews
             WHERE course_id = $1 AND status = 'approved'",
        )
        .bind(course_id)
        .fetch_one(db)
        .await?;

        let counts: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM course_reviews
             WHERE course_id = $1 AND status = 'approved'
             GROUP BY rating",
        )
        .bind(course_id)
        .fetch_all(db)
        .await?;

        let stats = ReviewStats {
            course_id,
            total_reviews: row.total_reviews,
            average_rating: row.average_rating,
            rating_distribution: ReviewStats::distribution(&counts),
            average_difficulty: row.average_difficulty,
            average_engagement: row.average_engagement,
            recommendation_percentage: row.recommendation_percentage,
        };

        if let Some(cache) = cache {
            cache.store(&key, &stats).await;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use supernova_models::UserRole;

    use crate::middleware::auth::test_user;

    fn review(author: Uuid, status: ReviewStatus) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_id: author,
            rating: 4,
            review_text: Some("Clear and well paced".to_string()),
            pros: vec![],
            cons: vec![],
            would_recommend: Some(true),
            difficulty_rating: None,
            engagement_rating: None,
            is_featured: false,
            status,
            moderated_by_id: None,
            moderated_at: None,
            moderation_comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_reviews_are_private_to_author_and_super_admin() {
        let author = test_user(UserRole::IndividualUser, None);
        let stranger = test_user(UserRole::IndividualUser, None);
        let root = test_user(UserRole::SuperAdmin, None);
        let pending = review(author.user_id(), ReviewStatus::Pending);

        assert!(can_view_review(&author, &pending));
        assert!(can_view_review(&root, &pending));
        assert!(!can_view_review(&stranger, &pending));

        let approved = review(author.user_id(), ReviewStatus::Approved);
        assert!(can_view_review(&stranger, &approved));
    }

    #[test]
    fn only_super_admin_lists_other_statuses() {
        let root = test_user(UserRole::SuperAdmin, None);
        let learner = test_user(UserRole::Student, Some(Uuid::new_v4()));

        assert_eq!(course_listing_status(&root, None), ReviewStatus::Approved);
        assert_eq!(
            course_listing_status(&root, Some(ReviewStatus::Pending)),
            ReviewStatus::Pending
        );
        assert_eq!(
            course_listing_status(&learner, Some(ReviewStatus::Hidden)),
            ReviewStatus::Approved
        );
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let original = review(Uuid::new_v4(), ReviewStatus::Approved);
        let merged = merge_review(
            original.clone(),
            UpdateReviewDto {
                rating: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(merged.rating, 2);
        assert_eq!(merged.review_text, original.review_text);
        assert_eq!(merged.status, ReviewStatus::Approved);
    }
}
