use anyhow::anyhow;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use supernova_core::{AppError, PaginationMeta};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::ensure_super_admin;
use crate::modules::course_modules::service::ModuleService;
use crate::modules::courses::service::{
    CourseScope, CourseService, LESSON_COLUMNS, course_visibility_sql,
};
use crate::utils::auth_helpers::search_pattern;

use super::model::{
    CreateLessonDto, Lesson, LessonFilterParams, PaginatedLessonsResponse, UpdateLessonDto,
};

const LESSON_FILTERS: &str = "($4::uuid IS NULL OR l.module_id = $4) \
     AND ($5::content_type IS NULL OR l.content_type = $5) \
     AND ($6::text IS NULL OR l.title ILIKE $6 OR l.description ILIKE $6)";

fn merge_lesson(mut lesson: Lesson, dto: UpdateLessonDto) -> Lesson {
    if let Some(title) = dto.title {
        lesson.title = title.trim().to_string();
    }
    lesson.description = dto.description.or(lesson.description);
    lesson.sequence_number = dto.sequence_number.unwrap_or(lesson.sequence_number);
    lesson.content_type = dto.content_type.unwrap_or(lesson.content_type);
    lesson.content = dto.content.unwrap_or(lesson.content);
    lesson.duration_minutes = dto.duration_minutes.or(lesson.duration_minutes);
    lesson.is_mandatory = dto.is_mandatory.unwrap_or(lesson.is_mandatory);
    lesson.completion_criteria = dto.completion_criteria.or(lesson.completion_criteria);
    lesson
}

pub struct LessonService;

impl LessonService {
    async fn find_lesson(db: &PgPool, id: Uuid) -> Result<Lesson, AppError> {
        sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons WHERE id = $1",
            LESSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Lesson not found")))
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "INSERT", db.table = "lessons"))]
    pub async fn add_lesson(
        db: &PgPool,
        auth_user: &AuthUser,
        module_id: Uuid,
        dto: CreateLessonDto,
    ) -> Result<Lesson, AppError> {
        ensure_super_admin(auth_user)?;
        ModuleService::find_module(db, module_id).await?;

        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "INSERT INTO lessons (module_id, title, description, sequence_number, content_type,
                 content, duration_minutes, is_mandatory, completion_criteria)
             VALUES ($1, $2, $3,
                 COALESCE($4, (SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM lessons WHERE module_id = $1)),
                 $5, $6, $7, $8, $9)
             RETURNING {}",
            LESSON_COLUMNS
        ))
        .bind(module_id)
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.sequence_number)
        .bind(dto.content_type)
        .bind(dto.content.unwrap_or_else(|| json!({})))
        .bind(dto.duration_minutes)
        .bind(dto.is_mandatory.unwrap_or(true))
        .bind(&dto.completion_criteria)
        .fetch_one(db)
        .await?;

        info!(lesson.id = %lesson.id, module.id = %module_id, "Lesson created");
        Ok(lesson)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "lessons"))]
    pub async fn get_lesson(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<Lesson, AppError> {
        let lesson = Self::find_lesson(db, id).await?;
        let module = ModuleService::find_module(db, lesson.module_id).await?;
        CourseService::ensure_content_access(db, auth_user, module.content_id).await?;
        Ok(lesson)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "SELECT", db.table = "lessons"))]
    pub async fn list_lessons(
        db: &PgPool,
        auth_user: &AuthUser,
        filters: LessonFilterParams,
    ) -> Result<PaginatedLessonsResponse, AppError> {
        let scope = CourseScope::of(auth_user);
        let search = search_pattern(filters.search.as_deref());
        let visible = format!(
            "($1 OR l.module_id IN (
                SELECT m.id FROM modules m
                JOIN course_versions v ON v.content_id = m.content_id
                JOIN courses c ON c.id = v.course_id
                WHERE {}))",
            course_visibility_sql()
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM lessons l WHERE {} AND {}",
            visible, LESSON_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.module_id)
        .bind(filters.content_type)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let lessons = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons l WHERE {} AND {}
             ORDER BY l.module_id, l.sequence_number, l.created_at
             LIMIT $7 OFFSET $8",
            LESSON_COLUMNS, visible, LESSON_FILTERS
        ))
        .bind(scope.is_super_admin)
        .bind(scope.user_id)
        .bind(scope.school_id)
        .bind(filters.module_id)
        .bind(filters.content_type)
        .bind(&search)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedLessonsResponse {
            data: lessons,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db, auth_user, dto), fields(db.operation = "UPDATE", db.table = "lessons"))]
    pub async fn update_lesson(
        db: &PgPool,
        auth_user: &AuthUser,
        id: Uuid,
        dto: UpdateLessonDto,
    ) -> Result<Lesson, AppError> {
        ensure_super_admin(auth_user)?;

        let lesson = merge_lesson(Self::find_lesson(db, id).await?, dto);

        let updated = sqlx::query_as::<_, Lesson>(&format!(
            "UPDATE lessons
             SET title = $1, description = $2, sequence_number = $3, content_type = $4,
                 content = $5, duration_minutes = $6, is_mandatory = $7,
                 completion_criteria = $8, updated_at = NOW()
             WHERE id = $9
             RETURNING {}",
            LESSON_COLUMNS
        ))
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(lesson.sequence_number)
        .bind(lesson.content_type)
        .bind(&lesson.content)
        .bind(lesson.duration_minutes)
        .bind(lesson.is_mandatory)
        .bind(&lesson.completion_criteria)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Lesson not found")))?;

        Ok(updated)
    }

    #[instrument(skip(db, auth_user), fields(db.operation = "DELETE", db.table = "lessons"))]
    pub async fn delete_lesson(db: &PgPool, auth_user: &AuthUser, id: Uuid) -> Result<(), AppError> {
        ensure_super_admin(auth_user)?;

        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Lesson not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use supernova_models::ContentType;

    #[test]
    fn merge_replaces_content_payload_only_when_given() {
        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            title: "Intro".to_string(),
            description: None,
            sequence_number: 1,
            content_type: ContentType::Text,
            content: json!({"body": "hello"}),
            duration_minutes: Some(10),
            is_mandatory: true,
            completion_criteria: None,
            created_at: now,
            updated_at: now,
        };

        let unchanged = merge_lesson(lesson.clone(), UpdateLessonDto::default());
        assert_eq!(unchanged.content, json!({"body": "hello"}));

        let video = merge_lesson(
            lesson,
            UpdateLessonDto {
                content_type: Some(ContentType::Video),
                content: Some(json!({"url": "https://cdn.example.com/v.mp4"})),
                ..Default::default()
            },
        );
        assert_eq!(video.content_type, ContentType::Video);
        assert_eq!(video.duration_minutes, Some(10));
        assert_eq!(video.content["url"], "https://cdn.example.com/v.mp4");
    }
}
