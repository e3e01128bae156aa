//! Token payloads.
//!
//! Access tokens carry everything authorization needs (id, role, school) so
//! requests are authorized without a database lookup. Refresh tokens carry
//! only identity; the user is re-loaded when they are exchanged.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject)
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// School scope; `None` for super admins and individual users
    pub school_id: Option<Uuid>,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Token id, unique per issued refresh token
    pub jti: Uuid,
}
