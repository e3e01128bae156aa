use uuid::Uuid;

use supernova_core::AppError;

use crate::middleware::auth::AuthUser;

/// The caller's school, for operations that only make sense inside one.
pub fn require_school_id(auth_user: &AuthUser) -> Result<Uuid, AppError> {
    auth_user
        .school_id()
        .ok_or_else(|| AppError::forbidden("User must be associated with a school"))
}

/// Lower-cases and trims an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `%term%` for ILIKE filters; `None` for a blank term.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::test_user;
    use supernova_models::UserRole;

    #[test]
    fn school_id_required_for_schoolless_callers() {
        let learner = test_user(UserRole::IndividualUser, None);
        assert_eq!(require_school_id(&learner).unwrap_err().status.as_u16(), 403);

        let school = Uuid::new_v4();
        let teacher = test_user(UserRole::Teacher, Some(school));
        assert_eq!(require_school_id(&teacher).unwrap(), school);
    }

    #[test]
    fn emails_normalize() {
        assert_eq!(normalize_email("  Ada@School.EDU "), "ada@school.edu");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some(" alg ")), Some("%alg%".to_string()));
    }
}
