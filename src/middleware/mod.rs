//! Authentication extractors and the authorization policy.
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] validates the token and exposes its claims
//! 3. [`role`] answers every permission question from those claims
//!
//! ```ignore
//! use crate::middleware::{auth::AuthUser, role::ensure_super_admin};
//!
//! async fn handler(auth_user: AuthUser) -> Result<impl IntoResponse, AppError> {
//!     ensure_super_admin(&auth_user)?;
//!     // ...
//! }
//! ```

pub mod auth;
pub mod role;
