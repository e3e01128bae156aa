//! Course reviews and rating statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use supernova_core::{PaginationMeta, PaginationParams};

use crate::enums::ReviewStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    /// Author
    pub user_id: Uuid,
    pub rating: i32,
    pub review_text: Option<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub would_recommend: Option<bool>,
    pub difficulty_rating: Option<i32>,
    pub engagement_rating: Option<i32>,
    pub is_featured: bool,
    pub status: ReviewStatus,
    pub moderated_by_id: Option<Uuid>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderation_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReviewDto {
    pub enrollment_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 5000))]
    pub review_text: Option<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    pub would_recommend: Option<bool>,
    #[validate(range(min = 1, max = 5))]
    pub difficulty_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub engagement_rating: Option<i32>,
}

/// Partial update. `status` is honoured for super admins only.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(max = 5000))]
    pub review_text: Option<String>,
    pub pros: Option<Vec<String>>,
    pub cons: Option<Vec<String>>,
    pub would_recommend: Option<bool>,
    #[validate(range(min = 1, max = 5))]
    pub difficulty_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub engagement_rating: Option<i32>,
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ModerateReviewDto {
    pub status: ReviewStatus,
    #[validate(length(max = 2000))]
    pub moderation_comment: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewFilterParams {
    /// Super admins only; everyone else sees approved reviews
    pub status: Option<ReviewStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedReviewsResponse {
    pub data: Vec<Review>,
    pub meta: PaginationMeta,
}

/// Aggregates over a course's approved reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReviewStats {
    pub course_id: Uuid,
    pub total_reviews: i64,
    pub average_rating: Option<f64>,
    /// Count per star rating, `1` through `5`, zero-filled
    pub rating_distribution: BTreeMap<u8, i64>,
    pub average_difficulty: Option<f64>,
    pub average_engagement: Option<f64>,
    /// Share of reviews that would recommend, among those that answered
    pub recommendation_percentage: Option<f64>,
}

impl ReviewStats {
    /// Zero-filled 1..=5 histogram from `(rating, count)` rows.
    pub fn distribution(counts: &[(i32, i64)]) -> BTreeMap<u8, i64> {
        let mut distribution: BTreeMap<u8, i64> = (1..=5).map(|star| (star, 0)).collect();
        for &(rating, count) in counts {
            if let Ok(star) = u8::try_from(rating)
                && let Some(slot) = distribution.get_mut(&star)
            {
                *slot += count;
            }
        }
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_is_zero_filled() {
        let distribution = ReviewStats::distribution(&[(5, 3), (2, 1)]);
        assert_eq!(distribution.len(), 5);
        assert_eq!(distribution[&1], 0);
        assert_eq!(distribution[&2], 1);
        assert_eq!(distribution[&5], 3);
    }

    #[test]
    fn out_of_range_ratings_are_ignored() {
        let distribution = ReviewStats::distribution(&[(0, 4), (6, 2), (-1, 1)]);
        assert!(distribution.values().all(|&c| c == 0));
    }

    #[test]
    fn distribution_serializes_with_string_keys() {
        let json = serde_json::to_value(ReviewStats::distribution(&[(4, 2)])).unwrap();
        assert_eq!(json["4"], 2);
        assert_eq!(json["1"], 0);
    }

    #[test]
    fn rating_bounds() {
        let dto = CreateReviewDto {
            enrollment_id: Uuid::new_v4(),
            rating: 6,
            review_text: None,
            pros: vec![],
            cons: vec![],
            would_recommend: None,
            difficulty_rating: Some(0),
            engagement_rating: None,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("rating"));
        assert!(fields.contains_key("difficulty_rating"));
    }
}
