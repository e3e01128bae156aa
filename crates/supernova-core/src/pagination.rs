//! Pagination for list endpoints.
//!
//! Every list accepts `limit` (1–100, default 10) plus either `offset` or a
//! 1-based `page`. When both are sent, `page` wins. The response carries a
//! [`PaginationMeta`] next to its `data` array:
//!
//! ```json
//! { "data": [], "meta": { "total": 42, "limit": 10, "offset": 20, "page": 3, "has_more": true } }
//! ```

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::serde::deserialize_optional_i64;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of matching rows
    pub total: i64,
    /// Page size that was applied
    pub limit: i64,
    /// Rows skipped before this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Page number, when the request was page-based
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Whether rows exist after this page
    pub has_more: bool,
}

impl PaginationMeta {
    /// Builds the metadata for a page fetched with `params`.
    pub fn from_params(total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();
        Self {
            total,
            limit,
            offset: Some(offset),
            page: params.page(),
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

#[derive(Debug, Clone, Default, Hash, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Maximum number of items to return (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    /// Number of items to skip (ignored when `page` is set)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
    /// Page number, starting at 1
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
}

impl PaginationParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            page: None,
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        match self.page {
            Some(page) => (page.max(1) - 1).saturating_mul(self.limit()),
            None => self.offset.unwrap_or(0).max(0),
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_ten_rows() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.page(), None);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PaginationParams::new(0, 0).limit(), 1);
        assert_eq!(PaginationParams::new(-4, 0).limit(), 1);
        assert_eq!(PaginationParams::new(500, 0).limit(), 100);
        assert_eq!(PaginationParams::new(25, 0).limit(), 25);
    }

    #[test]
    fn page_takes_precedence_over_offset() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(7),
            page: Some(3),
        };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.page(), Some(3));
    }

    #[test]
    fn page_zero_is_first_page() {
        let params = PaginationParams {
            limit: Some(10),
            offset: None,
            page: Some(0),
        };
        assert_eq!(params.offset(), 0);
        assert_eq!(params.page(), Some(1));
    }

    #[test]
    fn negative_offset_is_zero() {
        assert_eq!(PaginationParams::new(10, -3).offset(), 0);
    }

    #[test]
    fn huge_page_saturates() {
        let params = PaginationParams {
            limit: Some(100),
            offset: None,
            page: Some(i64::MAX / 10),
        };
        assert_eq!(params.offset(), i64::MAX);

        let meta = PaginationMeta::from_params(5, &params);
        assert!(!meta.has_more);
    }

    #[test]
    fn huge_offset_has_no_more_rows() {
        let meta = PaginationMeta::from_params(5, &PaginationParams::new(10, i64::MAX));
        assert_eq!(meta.offset, Some(i64::MAX));
        assert!(!meta.has_more);
    }

    #[test]
    fn meta_reports_remaining_rows() {
        let params = PaginationParams::new(10, 20);
        let meta = PaginationMeta::from_params(31, &params);
        assert!(meta.has_more);
        assert_eq!(meta.offset, Some(20));

        let meta = PaginationMeta::from_params(30, &params);
        assert!(!meta.has_more);
    }

    #[test]
    fn query_strings_parse_as_text() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"30","page":"2","offset":""}"#).unwrap();
        assert_eq!(params.limit(), 30);
        assert_eq!(params.offset(), 30);
    }

    #[test]
    fn meta_omits_missing_page() {
        let meta = PaginationMeta::from_params(5, &PaginationParams::new(10, 0));
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("page").is_none());
        assert_eq!(json["total"], 5);
    }
}
