use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use supernova_auth::{Claims, UserRole, verify_token};
use supernova_core::AppError;

use crate::state::AppState;

/// Extractor that validates the bearer token and provides the caller's
/// claims. Authorization decisions are made from the claims alone.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.0.sub
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    /// The caller's school; `None` for super admins and individual users.
    pub fn school_id(&self) -> Option<Uuid> {
        self.0.school_id
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn is_super_admin(&self) -> bool {
        self.0.role == UserRole::SuperAdmin
    }

    pub fn is_school_staff(&self) -> bool {
        self.0.role.is_school_staff()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized("Missing or invalid authorization header"))?;

        let claims = verify_token(bearer.token(), &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
pub(crate) fn test_user(role: UserRole, school_id: Option<Uuid>) -> AuthUser {
    AuthUser(Claims {
        sub: Uuid::new_v4(),
        email: format!("{}@example.com", role.as_str()),
        role,
        school_id,
        exp: 9_999_999_999,
        iat: 1_700_000_000,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_read_claims() {
        let school_id = Uuid::new_v4();
        let user = test_user(UserRole::Teacher, Some(school_id));

        assert_eq!(user.role(), UserRole::Teacher);
        assert_eq!(user.school_id(), Some(school_id));
        assert_eq!(user.email(), "teacher@example.com");
        assert!(user.is_school_staff());
        assert!(!user.is_super_admin());
    }

    #[test]
    fn super_admin_has_no_school() {
        let user = test_user(UserRole::SuperAdmin, None);
        assert!(user.is_super_admin());
        assert_eq!(user.school_id(), None);
        assert!(!user.is_school_staff());
    }
}
