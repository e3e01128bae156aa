use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta};
use supernova_models::purchases::ACTIVE_PURCHASE_SQL;
use supernova_observability::track_purchase_created;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{ensure_self_or_super_admin, ensure_super_admin};
use crate::modules::courses::service::CourseService;

use super::model::{
    CreatePurchaseDto, CurrencyTotal, PaginatedPurchasesResponse, Purchase,
    PurchaseFilterParams, PurchaseSummary, UpdatePurchaseDto,
};

const PURCHASE_COLUMNS: &str = "id, course_id, user_id, amount_paid, currency, payment_method, \
     payment_status, transaction_ref, purchase_date, valid_until, created_at, updated_at";

const RECENT_PURCHASES: i64 = 5;

/// `$1` is the course or user the listing is keyed on.
fn purchase_filters() -> String {
    format!(
        "($2::payment_status IS NULL OR payment_status = $2) \
         AND ($3::bool IS NOT TRUE OR ({}))",
        ACTIVE_PURCHASE_SQL
    )
}

#[derive(Debug, Clone, Copy)]
enum PurchaseOwner {
    Course,
    User,
}

impl PurchaseOwner {
    fn column(self) -> &'static str {
        match self {
            PurchaseOwner::Course => "course_id",
            PurchaseOwner::User => "user_id",
        }
    }
}

pub struct PurchaseService;

impl PurchaseService {
    async fn find_purchase(db: &PgPool, id: Uuid) -> Result<Purchase, AppError> {
        sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM course_purchases WHERE id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Purchase not found")))
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "course_purchases", course.id = %dto.course_id))]
    pub async fn create_purchase(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreatePurchaseDto,
    ) -> Result<Purchase, AppError> {
        if !auth_user.is_super_admin() && dto.user_id != auth_user.user_id() {
            return Err(AppError::forbidden("You can only purchase courses for yourself"));
        }

        let course = CourseService::find_course(db, None, dto.course_id).await?;
        if !course.is_d2c_enabled {
            return Err(AppError::bad_request(anyhow!(
                "Course is not available for individual purchase"
            )));
        }

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(dto.user_id)
                .fetch_one(db)
                .await?;
        if !user_exists {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        let has_active: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM course_purchases
             WHERE course_id = $1 AND user_id = $2 AND {})",
            ACTIVE_PURCHASE_SQL
        ))
        .bind(dto.course_id)
        .bind(dto.user_id)
        .fetch_one(db)
        .await?;
        if has_active {
            return Err(AppError::bad_request(anyhow!(
                "Active purchase already exists for this course"
            )));
        }

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "INSERT INTO course_purchases
                 (course_id, user_id, amount_paid, currency, payment_method, payment_status,
                  transaction_ref, valid_until)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            PURCHASE_COLUMNS
        ))
        .bind(dto.course_id)
        .bind(dto.user_id)
        .bind(dto.amount_paid)
        .bind(dto.currency.to_uppercase())
        .bind(dto.payment_method)
        .bind(dto.payment_status.unwrap_or_default())
        .bind(&dto.transaction_ref)
        .bind(dto.valid_until)
        .fetch_one(db)
        .await?;

        track_purchase_created(purchase.payment_status.as_str());
        info!(
            purchase.id = %purchase.id,
            purchase.status = purchase.payment_status.as_str(),
            "Purchase recorded"
        );
        Ok(purchase)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_purchases"))]
    pub async fn get_purchase(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<Purchase, AppError> {
        let purchase = Self::find_purchase(db, id).await?;
        ensure_self_or_super_admin(auth_user, purchase.user_id)?;
        Ok(purchase)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "course_purchases"))]
    pub async fn update_purchase(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdatePurchaseDto,
    ) -> Result<Purchase, AppError> {
        ensure_super_admin(auth_user)?;

        let existing = Self::find_purchase(db, id).await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "UPDATE course_purchases
             SET payment_status = $1, valid_until = $2, transaction_ref = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {}",
            PURCHASE_COLUMNS
        ))
        .bind(dto.payment_status.unwrap_or(existing.payment_status))
        .bind(dto.valid_until.or(existing.valid_until))
        .bind(dto.transaction_ref.or(existing.transaction_ref))
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(purchase)
    }

    async fn list_by(
        db: &PgPool,
        owner: PurchaseOwner,
        owner_id: Uuid,
        filters: PurchaseFilterParams,
    ) -> Result<PaginatedPurchasesResponse, AppError> {
        let filter_sql = purchase_filters();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM course_purchases WHERE {} = $1 AND {}",
            owner.column(),
            filter_sql
        ))
        .bind(owner_id)
        .bind(filters.payment_status)
        .bind(filters.active_only)
        .fetch_one(db)
        .await?;

        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM course_purchases WHERE {} = $1 AND {}
             ORDER BY purchase_date DESC
             LIMIT $4 OFFSET $5",
            PURCHASE_COLUMNS,
            owner.column(),
            filter_sql
        ))
        .bind(owner_id)
        .bind(filters.payment_status)
        .bind(filters.active_only)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedPurchasesResponse {
            data: purchases,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_purchases"))]
    pub async fn list_course_purchases(
        db: &PgPool,
        auth_user: &AuthUser,
        course_id: Uuid,
        filters: PurchaseFilterParams,
    ) -> Result<PaginatedPurchasesResponse, AppError> {
        ensure_super_admin(auth_user)?;
        Self::list_by(db, PurchaseOwner::Course, course_id, filters).await
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_purchases"))]
    pub async fn list_user_purchases(
        db: &PgPool,
        auth_user: &AuthUser,
        user_id: Uuid,
        filters: PurchaseFilterParams,
    ) -> Result<PaginatedPurchasesResponse, AppError> {
        ensure_self_or_super_admin(auth_user, user_id)?;
        Self::list_by(db, PurchaseOwner::User, user_id, filters).await
    }

    /// Counts, per-currency spend over completed purchases and the most
    /// recent purchases of one user.
    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "course_purchases"))]
    pub async fn purchase_summary(
        db: &PgPool,
        auth_user: &AuthUser,
        user_id: Uuid,
    ) -> Result<PurchaseSummary, AppError> {
        ensure_self_or_super_admin(auth_user, user_id)?;

        let (total_purchases, active_purchases, expired_purchases): (i64, i64, i64) =
            sqlx::query_as(&format!(
                "SELECT COUNT(*),
                        COUNT(*) FILTER (WHERE {}),
                        COUNT(*) FILTER (WHERE valid_until IS NOT NULL AND valid_until <= NOW())
                 FROM course_purchases WHERE user_id = $1",
                ACTIVE_PURCHASE_SQL
            ))
            .bind(user_id)
            .fetch_one(db)
            .await?;

        let total_spent = sqlx::query_as::<_, CurrencyTotal>(
            "SELECT currency, SUM(amount_paid)::float8 AS total
             FROM course_purchases
             WHERE user_id = $1 AND payment_status = 'completed'
             GROUP BY currency
             ORDER BY currency",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let recent_purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM course_purchases WHERE user_id = $1
             ORDER BY purchase_date DESC LIMIT $2",
            PURCHASE_COLUMNS
        ))
        .bind(user_id)
        .bind(RECENT_PURCHASES)
        .fetch_all(db)
        .await?;

        Ok(PurchaseSummary {
            user_id,
            total_purchases,
            active_purchases,
            expired_purchases,
            total_spent,
            recent_purchases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_keyed_on_one_column() {
        assert_eq!(PurchaseOwner::Course.column(), "course_id");
        assert_eq!(PurchaseOwner::User.column(), "user_id");
    }

    #[test]
    fn active_only_reuses_the_active_predicate() {
        assert!(purchase_filters().contains(ACTIVE_PURCHASE_SQL));
    }
}
