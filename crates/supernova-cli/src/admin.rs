//! One-off account and tenant management commands.

use sqlx::PgPool;
use uuid::Uuid;

use supernova_core::hash_password;
use supernova_models::{SubscriptionStatus, UserRole};

use crate::CliResult;

pub struct NewSchool {
    pub name: String,
    pub code: String,
    pub domain: String,
    pub contact_email: String,
    pub timezone: String,
    pub max_students: i32,
    pub max_teachers: i32,
}

pub async fn create_super_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> CliResult<Uuid> {
    if password.len() < supernova_core::MIN_PASSWORD_LENGTH as usize {
        return Err("Password must be at least 8 characters".into());
    }

    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, password, first_name, last_name, role, school_id)
         VALUES ($1, $2, $3, $4, $5, NULL)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(email.trim().to_lowercase())
    .bind(&hashed_password)
    .bind(first_name)
    .bind(last_name)
    .bind(UserRole::SuperAdmin)
    .fetch_optional(db)
    .await?;

    user_id.ok_or_else(|| "User with this email already exists".into())
}

pub async fn create_school(db: &PgPool, school: &NewSchool) -> CliResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO schools (name, code, domain, contact_email, timezone, subscription_status,
                              max_students, max_teachers)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT DO NOTHING
         RETURNING id",
    )
    .bind(&school.name)
    .bind(school.code.trim().to_uppercase())
    .bind(school.domain.trim().to_lowercase())
    .bind(school.contact_email.trim().to_lowercase())
    .bind(&school.timezone)
    .bind(SubscriptionStatus::Trial)
    .bind(school.max_students)
    .bind(school.max_teachers)
    .fetch_optional(db)
    .await?;

    id.ok_or_else(|| "A school with this code or domain already exists".into())
}

/// Activates or soft-deactivates a user by email. Returns false when no
/// user matched.
pub async fn set_user_active(db: &PgPool, email: &str, active: bool) -> CliResult<bool> {
    let status = if active { "active" } else { "inactive" };
    let result = sqlx::query(
        "UPDATE users SET is_active = $1, status = $2::user_status, updated_at = NOW()
         WHERE email = $3",
    )
    .bind(active)
    .bind(status)
    .bind(email.trim().to_lowercase())
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
