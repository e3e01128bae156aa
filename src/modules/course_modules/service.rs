use std::collections::HashSet;

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::ensure_super_admin;
use crate::modules::courses::service::{
    CourseScope, CourseService, MODULE_COLUMNS, course_visibility_sql,
};
use crate::utils::auth_helpers::search_pattern;

use super::model::{
    CourseModule, CreateModuleDto, ModuleFilterParams, PaginatedModulesResponse,
    ReorderModulesDto, UpdateModuleDto,
};

const MODULE_FILTERS: &str = "($4::uuid IS NULL OR m.content_id = $4) \
     AND ($5::uuid IS NULL OR m.content_id = (
         SELECT content_id FROM course_versions WHERE course_id = $5 AND valid_until IS NULL)) \
     AND ($6::course_status IS NULL OR m.status = $6) \
     AND ($7::text IS NULL OR m.title ILIKE $7 OR m.description ILIKE $7)";

/// The requested order must name every module of the content exactly once.
fn check_reorder(existing: &[Uuid], requested: &[Uuid]) -> Result<(), AppError> {
    let unique: HashSet<&Uuid> = requested.iter().collect();
    if unique.len() != requested.len() {
        return Err(AppError::bad_request(anyhow!("Duplicate module ids in reorder request")));
    }

    let current: HashSet<&Uuid> = existing.iter().collect();
    if unique != current {
        return Err(AppError::bad_request(anyhow!(
            "Module ids must match exactly the modules of the content"
        )));
    }
    Ok(())
}

fn merge_module(mut module: CourseModule, dto: UpdateModuleDto) -> CourseModule {
    if let Some(title) = dto.title {
        module.title = title.trim().to_string();
    }
    module.description = dto.description.or(module.description);
    module.sequence_number = dto.sequence_number.unwrap_or(module.sequence_number);
    module.duration_weeks = dto.duration_weeks.or(module.duration_weeks);
    module.status = dto.status.unwrap_or(module.status);
    module.completion_criteria = dto.completion_criteria.or(module.completion_criteria);
    module.is_mandatory = dto.is_mandatory.unwrap_or(module.is_mandatory);
    module
}

pub struct ModuleService;

impl ModuleService {
    pub async fn find_module(db: &PgPool, id: Uuid) -> Result<CourseModule, AppError> {
        sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM modules WHERE id = $1",
            MODULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Module not found")))
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "modules"))]
    pub async fn add_module(
        db: &PgPool,
        auth_user: &AuthUser,
        content_id: Uuid,
        dto: CreateModuleDto,
    ) -> Result<CourseModule, AppError> {
        ensure_super_admin(auth_user)?;
        CourseService::find_content(db, content_id).await?;

        let module = sqlx::query_as::<_, CourseModule>(&format!(
            "INSERT INTO modules (content_id, title, description, sequence_number, duration_weeks,
                 status, completion_criteria, is_mandatory)
             VALUES ($1, $2, $3,
                 COALESCE($4, (SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM modules WHERE content_id = $1)),
                 $5, COALESCE($6, 'draft'::course_status), $7, $8)
             RETURNING {}",
            MODULE_COLUMNS
        ))
        .bind(content_id)
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.sequence_number)
        .bind(dto.duration_weeks)
        .bind(dto.status)
        .bind(&dto.completion_criteria)
        .bind(dto.is_mandatory.unwrap_or(true))
        .fetch_one(db)
        .await?;

        info!(module.id = %module.id, content.id = %content_id, "Module created");
        Ok(module)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "modules"))]
    pub async fn get_module(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<CourseModule, AppError> {
        let module = Self::find_module(db, id).await?;
        CourseService::ensure_content_access(db, auth_user, module.content_id).await?;
        Ok(module)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "modules"))]
    pub async fn list_modules(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: ModuleFilterParams,
    ) -> Result<PaginatedModulesResponse, AppError> {
        let scope = CourseScope::of(auth_user);
        let search = search_pattern(filters.search.as_deref());
        let visible = format!(
            "($1 OR m.content_id IN (
                SELECT v.content_id FROM course_versions v
                JOIN courses c ON c.id = v.course_id
                WHERE {}))",
            course_visibility_sql()
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM modules m WHERE {} AND {}",
            visible, MODULE_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.content_id)
        .bind(filters.course_id)
        .bind(filters.status)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM modules m WHERE {} AND {}
             ORDER BY m.content_id, m.sequence_number, m.created_at
             LIMIT $8 OFFSET $9",
            MODULE_COLUMNS, visible, MODULE_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.content_id)
        .bind(filters.course_id)
        .bind(filters.status)
        .bind(&search)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedModulesResponse {
            data: modules,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "modules"))]
    pub async fn update_module(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateModuleDto,
    ) -> Result<CourseModule, AppError> {
        ensure_super_admin(auth_user)?;

        let module = merge_module(Self::find_module(db, id).await?, dto);

        let updated = sqlx::query_as::<_, CourseModule>(&format!(
            "UPDATE modules
             SET title = $1, description = $2, sequence_number = $3, duration_weeks = $4,
                 status = $5, completion_criteria = $6, is_mandatory = $7, updated_at = NOW()
             WHERE id = $8
             RETURNING {}",
            MODULE_COLUMNS
        ))
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.sequence_number)
        .bind(module.duration_weeks)
        .bind(module.status)
        .bind(&module.completion_criteria)
        .bind(module.is_mandatory)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Module not found")))?;

        Ok(updated)
    }

    /// Removes a module and, through the foreign key, its lessons.
    #[instrument(skip(db, auth_user), fields(db.operation = "DELETE", db.table = "modules"))]
    pub async fn delete_module(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<(), AppError> {
        ensure_super_admin(auth_user)?;

        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Module not found")));
        }
        Ok(())
    }

    /// Renumbers the modules of one content as 1..=n in the requested order.
    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "modules"))]
    pub async fn reorder_modules(
        db: &PgPool,
        auth_user: &AuthUser,
        dto: ReorderModulesDto,
    ) -> Result<Vec<CourseModule>, AppError> {
        ensure_super_admin(auth_user)?;
        CourseService::find_content(db, dto.content_id).await?;

        let mut tx = db.begin().await?;

        let existing: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM modules WHERE content_id = $1 FOR UPDATE")
                .bind(dto.content_id)
                .fetch_all(&mut *tx)
                .await?;
        check_reorder(&existing, &dto.module_ids)?;

        let sequence: Vec<i32> = (1..=dto.module_ids.len() as i32).collect();
        sqlx::query(
            "UPDATE modules m
             SET sequence_number = t.seq, updated_at = NOW()
             FROM UNNEST($1::uuid[], $2::int[]) AS t(id, seq)
             WHERE m.id = t.id",
        )
        .bind(&dto.module_ids)
        .bind(&sequence)
        .execute(&mut *tx)
        .await?;

        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM modules WHERE content_id = $1 ORDER BY sequence_number",
            MODULE_COLUMNS
        ))
        .bind(dto.content_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_accepts_a_permutation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(check_reorder(&[a, b], &[b, a]).is_ok());
    }

    #[test]
    fn reorder_rejects_missing_extra_and_duplicate_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let missing = check_reorder(&[a, b], &[a]).unwrap_err();
        assert_eq!(
            missing.message(),
            "Module ids must match exactly the modules of the content"
        );
        assert!(check_reorder(&[a], &[a, Uuid::new_v4()]).is_err());

        let duplicate = check_reorder(&[a, b], &[a, a]).unwrap_err();
        assert_eq!(duplicate.message(), "Duplicate module ids in reorder request");
    }
}
