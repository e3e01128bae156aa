use anyhow::anyhow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta, hash_password};
use supernova_db::{UNIQUE_VIOLATION, is_db_error};
use supernova_models::{UserRole, UserStatus};
use supernova_observability::track_user_created;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::{
    can_view_user, check_any_role, ensure_can_change_role, ensure_can_manage_user,
};
use crate::utils::auth_helpers::{normalize_email, search_pattern};

use super::model::{
    CreateUserDto, PaginatedUsersResponse, USER_COLUMNS, UpdateMeDto, UpdateUserDto, User,
    UserFilterParams,
};

const EMAIL_TAKEN: &str = "Email already registered";

const USER_FILTERS: &str = "($1::user_role IS NULL OR role = $1) \
     AND ($2::uuid IS NULL OR school_id = $2) \
     AND ($3::text IS NULL OR email ILIKE $3 OR first_name ILIKE $3 OR last_name ILIKE $3) \
     AND ($4::boolean IS NULL OR is_active = $4)";

#[derive(Debug, FromRow)]
struct SchoolLimits {
    is_active: bool,
    max_students: i32,
    max_teachers: i32,
}

/// Rejects a school role without a school and a school-less role with one.
fn check_membership(role: UserRole, school_id: Option<Uuid>) -> Result<(), AppError> {
    match (role.requires_school(), school_id) {
        (true, None) => Err(AppError::bad_request(anyhow!(
            "A school is required for role {}",
            role
        ))),
        (false, Some(_)) => Err(AppError::bad_request(anyhow!(
            "Role {} cannot belong to a school",
            role
        ))),
        _ => Ok(()),
    }
}

fn check_capacity(role: UserRole, active_members: i64, limits: &SchoolLimits) -> Result<(), AppError> {
    let (limit, label) = match role {
        UserRole::Student => (limits.max_students, "student"),
        UserRole::Teacher => (limits.max_teachers, "teacher"),
        _ => return Ok(()),
    };
    if active_members >= i64::from(limit) {
        return Err(AppError::bad_request(anyhow!(
            "School has reached its {} capacity",
            label
        )));
    }
    Ok(())
}

fn map_email_conflict(e: sqlx::Error) -> AppError {
    if is_db_error(&e, UNIQUE_VIOLATION) {
        return AppError::bad_request(anyhow!(EMAIL_TAKEN));
    }
    e.into()
}

pub struct UserService;

impl UserService {
    /// Locks the school row and checks that one more active `role` member
    /// fits. Concurrent additions to the same school serialize on the lock.
    pub(crate) async fn reserve_school_seat(
        tx: &mut Transaction<'_, Postgres>,
        school_id: Uuid,
        role: UserRole,
    ) -> Result<(), AppError> {
        let limits = sqlx::query_as::<_, SchoolLimits>(
            "SELECT is_active, max_students, max_teachers FROM schools WHERE id = $1 FOR UPDATE",
        )
        .bind(school_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        if !limits.is_active {
            return Err(AppError::bad_request(anyhow!("School is not active")));
        }

        if matches!(role, UserRole::Student | UserRole::Teacher) {
            let active_members: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM users WHERE school_id = $1 AND role = $2 AND is_active = TRUE",
            )
            .bind(school_id)
            .bind(role)
            .fetch_one(&mut **tx)
            .await?;
            check_capacity(role, active_members, &limits)?;
        }

        Ok(())
    }

    async fn ensure_email_available(db: &PgPool, email: &str) -> Result<(), AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(db)
            .await?;
        if exists {
            return Err(AppError::bad_request(anyhow!(EMAIL_TAKEN)));
        }
        Ok(())
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "users"))]
    pub async fn create_user(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        // School admins create inside their own school unless told otherwise
        let school_id = match (auth_user.role(), dto.school_id) {
            (UserRole::SchoolAdmin, None) if dto.role.requires_school() => auth_user.school_id(),
            (_, school_id) => school_id,
        };

        ensure_can_manage_user(auth_user, dto.role, school_id)?;
        check_membership(dto.role, school_id)?;

        let email = normalize_email(&dto.email);
        Self::ensure_email_available(db, &email).await?;
        let hashed_password = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;
        if let Some(school_id) = school_id {
            Self::reserve_school_seat(&mut tx, school_id, dto.role).await?;
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password, first_name, last_name, role, school_id, settings)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&email)
        .bind(&hashed_password)
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(dto.role)
        .bind(school_id)
        .bind(&dto.settings)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_email_conflict)?;

        tx.commit().await?;

        track_user_created(user.role.as_str());
        Ok(user)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user_by_id(db: &PgPool, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<User, AppError> {
        let user = Self::get_user_by_id(db, id).await?;
        if !can_view_user(auth_user, user.id, user.school_id) {
            return Err(AppError::forbidden(
                "You don't have permission to view this user",
            ));
        }
        Ok(user)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_user(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let existing = Self::get_user_by_id(db, id).await?;
        let is_self = auth_user.user_id() == id;

        if !is_self {
            ensure_can_manage_user(auth_user, existing.role, existing.school_id)?;
        }

        let role = dto.role.unwrap_or(existing.role);
        ensure_can_change_role(auth_user, existing.role, role)?;
        if role != existing.role {
            check_membership(role, existing.school_id)?;
        }

        if dto.is_active.is_some() && is_self && !auth_user.is_super_admin() {
            return Err(AppError::forbidden(
                "You cannot change your own activation status",
            ));
        }

        let email = match dto.email.as_deref().map(normalize_email) {
            Some(email) if email != existing.email => {
                Self::ensure_email_available(db, &email).await?;
                email
            }
            _ => existing.email.clone(),
        };

        let password = dto.password.as_deref().map(hash_password).transpose()?;

        let is_active = dto.is_active.unwrap_or(existing.is_active);
        let status = match dto.is_active {
            Some(true) => UserStatus::Active,
            Some(false) => UserStatus::Inactive,
            None => existing.status,
        };

        let mut tx = db.begin().await?;

        let reactivating = is_active && !existing.is_active;
        if let Some(school_id) = existing.school_id
            && (reactivating || role != existing.role)
        {
            Self::reserve_school_seat(&mut tx, school_id, role).await?;
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = $1, first_name = $2, last_name = $3, role = $4, is_active = $5,
                 status = $6, settings = $7, password = COALESCE($8, password), updated_at = NOW()
             WHERE id = $9
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&email)
        .bind(dto.first_name.as_deref().map(str::trim).unwrap_or(&existing.first_name))
        .bind(dto.last_name.as_deref().map(str::trim).unwrap_or(&existing.last_name))
        .bind(role)
        .bind(is_active)
        .bind(status)
        .bind(dto.settings.as_ref().or(existing.settings.as_ref()))
        .bind(password)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_email_conflict)?;

        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_me(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: UpdateMeDto,
    ) -> Result<User, AppError> {
        let existing = Self::get_user_by_id(db, auth_user.user_id()).await?;
        let password = dto.password.as_deref().map(hash_password).transpose()?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET first_name = $1, last_name = $2, settings = $3,
                 password = COALESCE($4, password), updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(dto.first_name.as_deref().map(str::trim).unwrap_or(&existing.first_name))
        .bind(dto.last_name.as_deref().map(str::trim).unwrap_or(&existing.last_name))
        .bind(dto.settings.as_ref().or(existing.settings.as_ref()))
        .bind(password)
        .bind(existing.id)
        .fetch_one(db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn delete_user(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<(), AppError> {
        if auth_user.user_id() == id {
            return Err(AppError::bad_request(anyhow!("Cannot delete your own account")));
        }

        let existing = Self::get_user_by_id(db, id).await?;
        ensure_can_manage_user(auth_user, existing.role, existing.school_id)?;

        sqlx::query(
            "UPDATE users SET is_active = FALSE, status = 'inactive', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;

        Ok(())
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn list_users(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        check_any_role(
            auth_user,
            &[UserRole::SuperAdmin, UserRole::SchoolAdmin, UserRole::Teacher],
        )?;

        // School staff never see past their own school
        let school_id = if auth_user.is_super_admin() {
            filters.school_id
        } else {
            auth_user.school_id()
        };
        let search = search_pattern(filters.search.as_deref());
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users WHERE {}",
            USER_FILTERS
        ))
        .bind(filters.role)
        .bind(school_id)
        .bind(&search)
        .bind(filters.is_active)
        .fetch_one(db)
        .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at DESC LIMIT $5 OFFSET $6",
            USER_COLUMNS, USER_FILTERS
        ))
        .bind(filters.role)
        .bind(school_id)
        .bind(&search)
        .bind(filters.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_students: i32, max_teachers: i32) -> SchoolLimits {
        SchoolLimits {
            is_active: true,
            max_students,
            max_teachers,
        }
    }

    #[test]
    fn school_roles_need_a_school() {
        let school = Some(Uuid::new_v4());
        assert!(check_membership(UserRole::Teacher, school).is_ok());
        assert!(check_membership(UserRole::Student, None).is_err());
        assert!(check_membership(UserRole::IndividualUser, school).is_err());
        assert!(check_membership(UserRole::SuperAdmin, None).is_ok());
    }

    #[test]
    fn capacity_is_per_role() {
        let school = limits(2, 1);
        assert!(check_capacity(UserRole::Student, 1, &school).is_ok());

        let err = check_capacity(UserRole::Student, 2, &school).unwrap_err();
        assert_eq!(err.message(), "School has reached its student capacity");

        let err = check_capacity(UserRole::Teacher, 1, &school).unwrap_err();
        assert_eq!(err.message(), "School has reached its teacher capacity");

        assert!(check_capacity(UserRole::SchoolAdmin, 100, &school).is_ok());
    }
}
