//! D2C purchases and B2B licenses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use supernova_core::serde::deserialize_optional_bool;
use supernova_core::{PaginationMeta, PaginationParams};

use crate::enums::{PaymentMethod, PaymentStatus};
use crate::validators::validate_currency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub amount_paid: f64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// Completed and not yet expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.payment_status == PaymentStatus::Completed
            && self.valid_until.is_none_or(|until| until > now)
    }
}

/// SQL predicate matching [`Purchase::is_active_at`] for the current time.
pub const ACTIVE_PURCHASE_SQL: &str =
    "payment_status = 'completed' AND (valid_until IS NULL OR valid_until > NOW())";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseDto {
    pub course_id: Uuid,
    /// Buyer; non-super-admins may only purchase for themselves
    pub user_id: Uuid,
    #[validate(range(min = 0.0))]
    pub amount_paid: f64,
    #[validate(custom(function = "validate_currency"))]
    #[schema(example = "USD")]
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: Option<PaymentStatus>,
    #[validate(length(max = 255))]
    pub transaction_ref: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseDto {
    pub payment_status: Option<PaymentStatus>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseFilterParams {
    pub payment_status: Option<PaymentStatus>,
    /// Only completed, unexpired purchases
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub active_only: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedPurchasesResponse {
    pub data: Vec<Purchase>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CurrencyTotal {
    pub currency: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseSummary {
    pub user_id: Uuid,
    pub total_purchases: i64,
    pub active_purchases: i64,
    pub expired_purchases: i64,
    /// Sum of completed purchases per currency
    pub total_spent: Vec<CurrencyTotal>,
    pub recent_purchases: Vec<Purchase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct License {
    pub id: Uuid,
    pub course_id: Uuid,
    pub school_id: Uuid,
    pub granted_by_id: Uuid,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Seat limit; `None` means unlimited
    pub max_students: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && self.valid_until.is_none_or(|until| until > now)
    }
}

/// SQL predicate matching [`License::is_valid_at`] for the current time.
/// Expects the license table aliased as `cl`.
pub const VALID_LICENSE_SQL: &str = "cl.is_active AND cl.valid_from <= NOW() \
     AND (cl.valid_until IS NULL OR cl.valid_until > NOW())";

fn validate_license_window(dto: &CreateLicenseDto) -> Result<(), ValidationError> {
    if let (Some(from), Some(until)) = (dto.valid_from, dto.valid_until)
        && until <= from
    {
        return Err(ValidationError::new("license_window")
            .with_message(Cow::Borrowed("valid_until must be after valid_from")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_license_window"))]
pub struct CreateLicenseDto {
    pub course_id: Uuid,
    pub school_id: Uuid,
    /// Defaults to now
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_students: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLicenseDto {
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_students: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LicenseFilterParams {
    /// Only licenses valid right now
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub active_only: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedLicensesResponse {
    pub data: Vec<License>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LicenseCheckResponse {
    pub is_valid: bool,
    pub license_id: Option<Uuid>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Enrollments of this school's students in the course
    pub seats_used: i64,
    pub max_students: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn purchase(status: PaymentStatus, valid_until: Option<DateTime<Utc>>) -> Purchase {
        let now = Utc::now();
        Purchase {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_paid: 49.99,
            currency: "USD".to_string(),
            payment_method: PaymentMethod::Stripe,
            payment_status: status,
            transaction_ref: None,
            purchase_date: now,
            valid_until,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_purchase_is_completed_and_unexpired() {
        let now = Utc::now();
        assert!(purchase(PaymentStatus::Completed, None).is_active_at(now));
        assert!(
            purchase(PaymentStatus::Completed, Some(now + Duration::days(1))).is_active_at(now)
        );
        assert!(
            !purchase(PaymentStatus::Completed, Some(now - Duration::days(1))).is_active_at(now)
        );
        assert!(!purchase(PaymentStatus::Pending, None).is_active_at(now));
        assert!(!purchase(PaymentStatus::Refunded, None).is_active_at(now));
    }

    #[test]
    fn license_validity_window() {
        let now = Utc::now();
        let mut license = License {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            granted_by_id: Uuid::new_v4(),
            valid_from: now - Duration::days(10),
            valid_until: Some(now + Duration::days(10)),
            max_students: Some(30),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(license.is_valid_at(now));

        license.valid_from = now + Duration::days(1);
        assert!(!license.is_valid_at(now));

        license.valid_from = now - Duration::days(10);
        license.is_active = false;
        assert!(!license.is_valid_at(now));
    }

    #[test]
    fn license_window_must_be_forward() {
        let now = Utc::now();
        let dto = CreateLicenseDto {
            course_id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            valid_from: Some(now),
            valid_until: Some(now),
            max_students: None,
        };
        assert!(dto.validate().is_err());
    }
}
