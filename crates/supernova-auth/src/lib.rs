//! # Supernova Auth
//!
//! - [`roles`]: the [`UserRole`] enum and the role hierarchy
//! - [`claims`]: access and refresh token payloads
//! - [`jwt`]: token creation and verification
//!
//! ```ignore
//! use supernova_auth::{UserRole, create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "t@school.edu", UserRole::Teacher, Some(school_id), &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, UserRole::Teacher);
//! ```

pub mod claims;
pub mod jwt;
pub mod roles;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
pub use roles::UserRole;
