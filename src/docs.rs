use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use supernova_core::{PaginationMeta, PaginationParams};
use supernova_models::admin::{
    ComponentHealth, ComponentStatus, ContentStats, PlatformStats, SystemHealth,
};
use supernova_models::auth::{LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest};
use supernova_models::content::{
    ContentTree, CourseContent, CourseModule, CourseVersion, CourseVersionDetail,
    CreateContentDto, CreateLessonDto, CreateModuleDto, CreateVersionDto, Lesson,
    ModuleWithLessons, PaginatedLessonsResponse, PaginatedModulesResponse, ReorderModulesDto,
    UpdateContentDto, UpdateLessonDto, UpdateModuleDto,
};
use supernova_models::courses::{
    Course, CourseDetail, CreateCourseDto, PaginatedCoursesResponse, UpdateCourseDto,
};
use supernova_models::enrollments::{
    EnrollIndividualDto, EnrollStudentDto, Enrollment, EnrollmentProgress,
    PaginatedEnrollmentsResponse, ProgressUpdateResponse, UpdateEnrollmentStatusDto,
    UpdateProgressDto, UserProgress,
};
use supernova_models::purchases::{
    CreateLicenseDto, CreatePurchaseDto, CurrencyTotal, License, LicenseCheckResponse,
    PaginatedLicensesResponse, PaginatedPurchasesResponse, Purchase, PurchaseSummary,
    UpdateLicenseDto, UpdatePurchaseDto,
};
use supernova_models::reviews::{
    CreateReviewDto, ModerateReviewDto, PaginatedReviewsResponse, Review, ReviewStats,
    UpdateReviewDto,
};
use supernova_models::schools::{
    CreateSchoolAdminDto, CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolStats,
    SchoolWithStats, UpdateSchoolDto,
};
use supernova_models::users::{
    CreateUserDto, PaginatedUsersResponse, UpdateMeDto, UpdateUserDto, User,
};
use supernova_models::{
    ContentType, CourseStatus, DifficultyLevel, EnrollmentStatus, EnrollmentType,
    PaymentMethod, PaymentStatus, ProgressContentType, ProgressStatus, ReviewStatus, UserRole,
    UserStatus,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_me,
        crate::modules::users::controller::update_me,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::list_schools,
        crate::modules::schools::controller::get_my_school,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::list_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::update_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::courses::controller::create_version,
        crate::modules::courses::controller::list_versions,
        crate::modules::courses::controller::update_content,
        crate::modules::courses::controller::add_module,
        crate::modules::courses::controller::add_lesson,
        crate::modules::course_modules::controller::list_modules,
        crate::modules::course_modules::controller::get_module,
        crate::modules::course_modules::controller::update_module,
        crate::modules::course_modules::controller::delete_module,
        crate::modules::course_modules::controller::reorder_modules,
        crate::modules::lessons::controller::list_lessons,
        crate::modules::lessons::controller::get_lesson,
        crate::modules::lessons::controller::update_lesson,
        crate::modules::lessons::controller::delete_lesson,
        crate::modules::enrollments::controller::enroll_student,
        crate::modules::enrollments::controller::enroll_individual,
        crate::modules::enrollments::controller::list_enrollments,
        crate::modules::enrollments::controller::update_enrollment_status,
        crate::modules::enrollments::controller::update_progress,
        crate::modules::enrollments::controller::get_enrollment_progress,
        crate::modules::purchases::controller::create_purchase,
        crate::modules::purchases::controller::get_purchase,
        crate::modules::purchases::controller::update_purchase,
        crate::modules::purchases::controller::list_course_purchases,
        crate::modules::purchases::controller::list_user_purchases,
        crate::modules::purchases::controller::purchase_summary,
        crate::modules::licenses::controller::create_license,
        crate::modules::licenses::controller::get_license,
        crate::modules::licenses::controller::update_license,
        crate::modules::licenses::controller::list_course_licenses,
        crate::modules::licenses::controller::list_school_licenses,
        crate::modules::licenses::controller::check_license,
        crate::modules::reviews::controller::create_review,
        crate::modules::reviews::controller::get_review,
        crate::modules::reviews::controller::update_review,
        crate::modules::reviews::controller::delete_review,
        crate::modules::reviews::controller::moderate_review,
        crate::modules::reviews::controller::list_course_reviews,
        crate::modules::reviews::controller::list_user_reviews,
        crate::modules::reviews::controller::get_enrollment_review,
        crate::modules::reviews::controller::review_stats,
        crate::modules::admin::controller::platform_stats,
        crate::modules::admin::controller::system_health,
        crate::modules::admin::controller::list_users,
        crate::modules::admin::controller::create_admin_user,
        crate::modules::admin::controller::suspend_user,
        crate::modules::admin::controller::reinstate_user,
        crate::modules::admin::controller::content_stats,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            PaginationParams,
            UserRole,
            UserStatus,
            CourseStatus,
            DifficultyLevel,
            ContentType,
            EnrollmentType,
            EnrollmentStatus,
            ProgressContentType,
            ProgressStatus,
            PaymentStatus,
            PaymentMethod,
            ReviewStatus,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            MessageResponse,
            User,
            CreateUserDto,
            UpdateUserDto,
            UpdateMeDto,
            PaginatedUsersResponse,
            School,
            SchoolStats,
            SchoolWithStats,
            CreateSchoolDto,
            CreateSchoolAdminDto,
            UpdateSchoolDto,
            PaginatedSchoolsResponse,
            Course,
            CourseDetail,
            CreateCourseDto,
            UpdateCourseDto,
            PaginatedCoursesResponse,
            CourseContent,
            CourseVersion,
            CourseVersionDetail,
            ContentTree,
            ModuleWithLessons,
            CreateContentDto,
            CreateVersionDto,
            UpdateContentDto,
            CourseModule,
            CreateModuleDto,
            UpdateModuleDto,
            ReorderModulesDto,
            PaginatedModulesResponse,
            Lesson,
            CreateLessonDto,
            UpdateLessonDto,
            PaginatedLessonsResponse,
            Enrollment,
            UserProgress,
            EnrollStudentDto,
            EnrollIndividualDto,
            UpdateEnrollmentStatusDto,
            UpdateProgressDto,
            EnrollmentProgress,
            ProgressUpdateResponse,
            PaginatedEnrollmentsResponse,
            Purchase,
            CreatePurchaseDto,
            UpdatePurchaseDto,
            CurrencyTotal,
            PurchaseSummary,
            PaginatedPurchasesResponse,
            License,
            CreateLicenseDto,
            UpdateLicenseDto,
            LicenseCheckResponse,
            PaginatedLicensesResponse,
            Review,
            CreateReviewDto,
            UpdateReviewDto,
            ModerateReviewDto,
            ReviewStats,
            PaginatedReviewsResponse,
            PlatformStats,
            ComponentStatus,
            ComponentHealth,
            SystemHealth,
            ContentStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh and current user"),
        (name = "Users", description = "User management within tenant boundaries"),
        (name = "Schools", description = "Tenant management"),
        (name = "Courses", description = "Course catalog, versions and content"),
        (name = "Modules", description = "Course modules"),
        (name = "Lessons", description = "Module lessons"),
        (name = "Enrollments", description = "B2B and D2C enrollments and progress"),
        (name = "Purchases", description = "D2C course purchases"),
        (name = "Licenses", description = "B2B course licenses"),
        (name = "Reviews", description = "Course reviews and moderation"),
        (name = "Admin", description = "Platform administration")
    ),
    info(
        title = "Supernova API",
        version = "0.1.0",
        description = "Multi-tenant learning management API built with Rust, Axum and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_auth() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn every_area_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/courses/{id}/versions",
            "/api/v1/modules/reorder",
            "/api/v1/enrollments/progress",
            "/api/v1/purchases/licenses/check/{course_id}/{school_id}",
            "/api/v1/reviews/stats/{course_id}",
            "/api/v1/admin/content/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
