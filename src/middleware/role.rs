//! Authorization policy.
//!
//! Every permission decision in the API goes through this module. Handlers
//! and services ask questions such as "may this caller act on this school"
//! or "may this caller assign that role" instead of comparing roles inline.
//!
//! Three forms are provided:
//! 1. Route middleware: [`require_super_admin`]
//! 2. Extractors: [`RequireSuperAdmin`], [`RequireSchoolStaff`]
//! 3. Checks returning `Result<(), AppError>`: [`check_any_role`],
//!    [`ensure_super_admin`], [`ensure_school_access`], [`ensure_self_or_super_admin`],
//!    [`ensure_can_manage_user`], [`ensure_can_update_enrollment`],
//!    [`ensure_can_record_progress`]

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use supernova_core::AppError;
use supernova_models::UserRole;
use supernova_models::enrollments::Enrollment;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Route middleware admitting only super admins.
///
/// ```rust,ignore
/// let admin_routes = Router::new()
///     .route("/stats", get(platform_stats))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_super_admin));
/// ```
pub async fn require_super_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let auth_user = match AuthUser::from_request_parts(&mut parts, &state).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = ensure_super_admin(&auth_user) {
        return err.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Extractor for super-admin-only handlers.
#[derive(Debug, Clone)]
pub struct RequireSuperAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        ensure_super_admin(&auth_user)?;
        Ok(RequireSuperAdmin(auth_user))
    }
}

/// Extractor for handlers open to school admins and teachers.
#[derive(Debug, Clone)]
pub struct RequireSchoolStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireSchoolStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_any_role(&auth_user, &[UserRole::SchoolAdmin, UserRole::Teacher])?;
        Ok(RequireSchoolStaff(auth_user))
    }
}

pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    if !allowed_roles.contains(&auth_user.role()) {
        let allowed: Vec<&str> = allowed_roles.iter().map(UserRole::as_str).collect();
        return Err(AppError::forbidden(format!(
            "Access denied. Required roles: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

pub fn ensure_super_admin(auth_user: &AuthUser) -> Result<(), AppError> {
    if !auth_user.is_super_admin() {
        return Err(AppError::forbidden(
            "Access denied. Super admin privileges required",
        ));
    }
    Ok(())
}

/// Whether the caller may read data scoped to `school_id`: super admins
/// always, everyone else only inside their own school.
pub fn can_access_school(auth_user: &AuthUser, school_id: Option<Uuid>) -> bool {
    auth_user.is_super_admin()
        || (school_id.is_some() && auth_user.school_id() == school_id)
}

pub fn ensure_school_access(auth_user: &AuthUser, school_id: Option<Uuid>) -> Result<(), AppError> {
    if !can_access_school(auth_user, school_id) {
        return Err(AppError::forbidden("Access denied to this school's data"));
    }
    Ok(())
}

/// Super admins, or school staff of `school_id`.
pub fn can_manage_school_members(auth_user: &AuthUser, school_id: Option<Uuid>) -> bool {
    auth_user.is_super_admin() || (auth_user.is_school_staff() && can_access_school(auth_user, school_id))
}

pub fn ensure_self_or_super_admin(auth_user: &AuthUser, user_id: Uuid) -> Result<(), AppError> {
    if auth_user.user_id() != user_id && !auth_user.is_super_admin() {
        return Err(AppError::forbidden("You can only access your own records"));
    }
    Ok(())
}

/// Whether the caller may create or modify a user with `target_role` in
/// `target_school`.
///
/// Super admins manage anyone. School admins manage teachers and students of
/// their own school. Nobody else manages users.
pub fn ensure_can_manage_user(
    auth_user: &AuthUser,
    target_role: UserRole,
    target_school: Option<Uuid>,
) -> Result<(), AppError> {
    match auth_user.role() {
        UserRole::SuperAdmin => Ok(()),
        UserRole::SchoolAdmin => {
            if !auth_user.role().can_assign(target_role) {
                return Err(AppError::forbidden(
                    "School admins can only manage teachers and students",
                ));
            }
            ensure_school_access(auth_user, target_school)
        }
        _ => Err(AppError::forbidden(
            "You don't have permission to manage users",
        )),
    }
}

/// Role changes are reserved to super admins.
pub fn ensure_can_change_role(
    auth_user: &AuthUser,
    current: UserRole,
    requested: UserRole,
) -> Result<(), AppError> {
    if current != requested && !auth_user.is_super_admin() {
        return Err(AppError::forbidden("Only super admins can change user roles"));
    }
    Ok(())
}

/// Visibility of a user record: super admins see everyone, school admins and
/// teachers see their own school, everyone sees themselves.
pub fn can_view_user(auth_user: &AuthUser, user_id: Uuid, user_school: Option<Uuid>) -> bool {
    auth_user.user_id() == user_id
        || auth_user.is_super_admin()
        || (auth_user.is_school_staff() && can_access_school(auth_user, user_school))
}

/// Enrollment visibility. `student_school` is the school of the enrolled
/// student for B2B enrollments.
pub fn can_view_enrollment(
    auth_user: &AuthUser,
    enrollment: &Enrollment,
    student_school: Option<Uuid>,
) -> bool {
    auth_user.is_super_admin()
        || enrollment.learner_id() == Some(auth_user.user_id())
        || (auth_user.is_school_staff()
            && enrollment.student_id.is_some()
            && can_access_school(auth_user, student_school))
}

/// Status changes: super admins, staff of the student's school, or the
/// individual user on their own D2C enrollment.
pub fn ensure_can_update_enrollment(
    auth_user: &AuthUser,
    enrollment: &Enrollment,
    student_school: Option<Uuid>,
) -> Result<(), AppError> {
    let allowed = match auth_user.role() {
        UserRole::SuperAdmin => true,
        UserRole::SchoolAdmin | UserRole::Teacher => {
            enrollment.student_id.is_some() && can_access_school(auth_user, student_school)
        }
        UserRole::IndividualUser => enrollment.individual_user_id == Some(auth_user.user_id()),
        UserRole::Student => false,
    };
    if !allowed {
        return Err(AppError::forbidden(
            "You don't have permission to modify this enrollment",
        ));
    }
    Ok(())
}

/// Learners record their own progress. Staff may record on behalf of
/// students of their school.
pub fn ensure_can_record_progress(
    auth_user: &AuthUser,
    enrollment: &Enrollment,
    student_school: Option<Uuid>,
) -> Result<(), AppError> {
    let allowed = match auth_user.role() {
        UserRole::SuperAdmin => true,
        UserRole::SchoolAdmin | UserRole::Teacher => {
            enrollment.student_id.is_some() && can_access_school(auth_user, student_school)
        }
        UserRole::Student => enrollment.student_id == Some(auth_user.user_id()),
        UserRole::IndividualUser => enrollment.individual_user_id == Some(auth_user.user_id()),
    };
    if !allowed {
        return Err(AppError::forbidden(
            "You can only record progress for your own enrollment",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::test_user;

    #[test]
    fn school_scope_is_exact() {
        let school = Uuid::new_v4();
        let admin = test_user(UserRole::SchoolAdmin, Some(school));

        assert!(can_access_school(&admin, Some(school)));
        assert!(!can_access_school(&admin, Some(Uuid::new_v4())));
        assert!(!can_access_school(&admin, None));

        let root = test_user(UserRole::SuperAdmin, None);
        assert!(can_access_school(&root, Some(school)));
        assert!(can_access_school(&root, None));
    }

    #[test]
    fn individual_users_never_match_an_empty_school() {
        let learner = test_user(UserRole::IndividualUser, None);
        assert!(!can_access_school(&learner, None));
    }

    #[test]
    fn school_admin_manages_only_own_teachers_and_students() {
        let school = Uuid::new_v4();
        let admin = test_user(UserRole::SchoolAdmin, Some(school));

        assert!(ensure_can_manage_user(&admin, UserRole::Teacher, Some(school)).is_ok());
        assert!(ensure_can_manage_user(&admin, UserRole::Student, Some(school)).is_ok());
        assert!(ensure_can_manage_user(&admin, UserRole::Student, Some(Uuid::new_v4())).is_err());
        assert!(ensure_can_manage_user(&admin, UserRole::SchoolAdmin, Some(school)).is_err());
        assert!(ensure_can_manage_user(&admin, UserRole::SuperAdmin, None).is_err());
    }

    #[test]
    fn learners_and_teachers_cannot_manage_users() {
        let school = Uuid::new_v4();
        for role in [UserRole::Teacher, UserRole::Student] {
            let user = test_user(role, Some(school));
            let err = ensure_can_manage_user(&user, UserRole::Student, Some(school)).unwrap_err();
            assert_eq!(err.status.as_u16(), 403);
        }
        let learner = test_user(UserRole::IndividualUser, None);
        assert!(ensure_can_manage_user(&learner, UserRole::IndividualUser, None).is_err());
    }

    #[test]
    fn only_super_admin_changes_roles() {
        let school = Uuid::new_v4();
        let admin = test_user(UserRole::SchoolAdmin, Some(school));
        let root = test_user(UserRole::SuperAdmin, None);

        let err =
            ensure_can_change_role(&admin, UserRole::Teacher, UserRole::SchoolAdmin).unwrap_err();
        assert_eq!(err.message(), "Only super admins can change user roles");
        assert!(ensure_can_change_role(&admin, UserRole::Teacher, UserRole::Teacher).is_ok());
        assert!(ensure_can_change_role(&root, UserRole::Teacher, UserRole::SuperAdmin).is_ok());
    }

    #[test]
    fn user_visibility() {
        let school = Uuid::new_v4();
        let teacher = test_user(UserRole::Teacher, Some(school));
        let student = test_user(UserRole::Student, Some(school));

        assert!(can_view_user(&teacher, student.user_id(), Some(school)));
        assert!(!can_view_user(&student, teacher.user_id(), Some(school)));
        assert!(can_view_user(&student, student.user_id(), Some(school)));
        assert!(!can_view_user(&teacher, Uuid::new_v4(), Some(Uuid::new_v4())));
    }

    #[test]
    fn self_or_super_admin() {
        let learner = test_user(UserRole::IndividualUser, None);
        assert!(ensure_self_or_super_admin(&learner, learner.user_id()).is_ok());
        assert!(ensure_self_or_super_admin(&learner, Uuid::new_v4()).is_err());

        let root = test_user(UserRole::SuperAdmin, None);
        assert!(ensure_self_or_super_admin(&root, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn check_any_role_lists_allowed_roles() {
        let student = test_user(UserRole::Student, Some(Uuid::new_v4()));
        let err = check_any_role(&student, &[UserRole::SchoolAdmin, UserRole::Teacher]).unwrap_err();
        assert_eq!(
            err.message(),
            "Access denied. Required roles: school_admin, teacher"
        );
    }

    fn enrollment(student: Option<Uuid>, individual: Option<Uuid>) -> Enrollment {
        use supernova_models::{EnrollmentStatus, EnrollmentType};
        let now = chrono::Utc::now();
        Enrollment {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            version_id: Uuid::new_v4(),
            student_id: student,
            individual_user_id: individual,
            enrolled_by_id: Uuid::new_v4(),
            enrollment_type: if student.is_some() {
                EnrollmentType::B2b
            } else {
                EnrollmentType::D2c
            },
            status: EnrollmentStatus::Enrolled,
            enrolled_at: now,
            completed_at: None,
            progress: 0.0,
            last_activity_at: None,
            completion_score: None,
            certificate_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn staff_see_only_their_school_enrollments() {
        let school = Uuid::new_v4();
        let teacher = test_user(UserRole::Teacher, Some(school));
        let student = test_user(UserRole::Student, Some(school));
        let b2b = enrollment(Some(student.user_id()), None);

        assert!(can_view_enrollment(&teacher, &b2b, Some(school)));
        assert!(can_view_enrollment(&student, &b2b, Some(school)));
        assert!(!can_view_enrollment(&teacher, &b2b, Some(Uuid::new_v4())));

        let d2c = enrollment(None, Some(Uuid::new_v4()));
        assert!(!can_view_enrollment(&teacher, &d2c, None));
    }

    #[test]
    fn students_cannot_change_enrollment_status() {
        let school = Uuid::new_v4();
        let student = test_user(UserRole::Student, Some(school));
        let own = enrollment(Some(student.user_id()), None);
        assert!(ensure_can_update_enrollment(&student, &own, Some(school)).is_err());

        let learner = test_user(UserRole::IndividualUser, None);
        let mine = enrollment(None, Some(learner.user_id()));
        assert!(ensure_can_update_enrollment(&learner, &mine, None).is_ok());
        let theirs = enrollment(None, Some(Uuid::new_v4()));
        assert!(ensure_can_update_enrollment(&learner, &theirs, None).is_err());
    }

    #[test]
    fn progress_is_recorded_by_learner_or_school_staff() {
        let school = Uuid::new_v4();
        let student = test_user(UserRole::Student, Some(school));
        let admin = test_user(UserRole::SchoolAdmin, Some(school));
        let other_student = test_user(UserRole::Student, Some(school));
        let own = enrollment(Some(student.user_id()), None);

        assert!(ensure_can_record_progress(&student, &own, Some(school)).is_ok());
        assert!(ensure_can_record_progress(&admin, &own, Some(school)).is_ok());
        let err = ensure_can_record_progress(&other_student, &own, Some(school)).unwrap_err();
        assert_eq!(err.message(), "You can only record progress for your own enrollment");
    }
}
